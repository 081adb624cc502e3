//! Host contract shared by the onset and silence detectors
//!
//! A host constructs a plugin with its input sample rate, optionally
//! adjusts parameters, calls [`Plugin::initialise`] once with the channel
//! count and step/block sizes, then calls [`Plugin::process`] once per
//! block and [`Plugin::remaining_features`] once at end of stream.

mod realtime;
mod types;

pub use realtime::RealTime;
pub use types::{Feature, FeatureSet, OutputDescriptor, ParameterDescriptor, SampleType};

use crate::error::PluginError;

/// Block-based feature extractor driven by a host
pub trait Plugin {
    fn identifier(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn maker(&self) -> &'static str;
    fn copyright(&self) -> &'static str;
    fn plugin_version(&self) -> u32;

    fn input_sample_rate(&self) -> f32;

    /// Step size the plugin works best with (a hint, not enforced)
    fn preferred_step_size(&self) -> usize;

    fn preferred_block_size(&self) -> usize {
        self.preferred_step_size()
    }

    fn parameter_descriptors(&self) -> Vec<ParameterDescriptor>;

    /// Current value of a parameter, `None` if the identifier is unknown
    fn parameter(&self, identifier: &str) -> Option<f32>;

    fn set_parameter(&mut self, identifier: &str, value: f32) -> Result<(), PluginError>;

    fn output_descriptors(&self) -> Vec<OutputDescriptor>;

    /// Allocate all per-stream state; must precede the first `process`
    fn initialise(
        &mut self,
        channels: usize,
        step_size: usize,
        block_size: usize,
    ) -> Result<(), PluginError>;

    /// Clear transient detector state, keeping configuration
    fn reset(&mut self);

    /// Process one step of audio: `input[channel][sample]`
    fn process(&mut self, input: &[&[f32]], timestamp: RealTime)
        -> Result<FeatureSet, PluginError>;

    /// Flush features still pending at end of stream
    fn remaining_features(&mut self) -> FeatureSet;
}

/// Geometry fixed at `initialise`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamGeometry {
    pub channels: usize,
    pub step_size: usize,
    pub block_size: usize,
}

impl StreamGeometry {
    pub fn new(channels: usize, step_size: usize, block_size: usize) -> Result<Self, PluginError> {
        if channels == 0 || step_size == 0 || block_size == 0 {
            return Err(PluginError::InvalidGeometry {
                channels,
                step_size,
                block_size,
            });
        }
        Ok(Self {
            channels,
            step_size,
            block_size,
        })
    }

    /// Reject input that does not match the initialised geometry
    pub fn check_input(&self, input: &[&[f32]]) -> Result<(), PluginError> {
        if input.len() != self.channels {
            return Err(PluginError::ChannelCountMismatch {
                expected: self.channels,
                actual: input.len(),
            });
        }
        for (channel, samples) in input.iter().enumerate() {
            if samples.len() < self.step_size {
                return Err(PluginError::BlockLengthMismatch {
                    channel,
                    expected: self.step_size,
                    actual: samples.len(),
                });
            }
        }
        Ok(())
    }
}

/// Sample rate rounded to whole frames per second
pub(crate) fn rounded_rate(sample_rate: f32) -> u32 {
    sample_rate.round().max(0.0) as u32
}
