// SilencePlugin - silent/non-silent region detector
//
// State machine:
//   uninitialised → initialised → first block → steady state
//
// Each step is classified against the threshold. On the first block, and
// whenever the classification changes, the transition is refined to
// sub-block precision and reported: always as a `silence-level` instant
// (0 when silent, 1 otherwise), and as region features in the format
// chosen at construction. The current and previous steps then swap
// banks, whether or not a transition occurred.

use crate::analysis::silence::DEFAULT_SILENCE_THRESHOLD_DB;
use crate::analysis::{BoundaryRefiner, FrameBuffer, SilenceClassifier};
use crate::config::SilenceConfig;
use crate::error::PluginError;
use crate::plugin::{
    rounded_rate, Feature, FeatureSet, OutputDescriptor, ParameterDescriptor, Plugin, RealTime,
    SampleType, StreamGeometry,
};

use super::region::{reporter_for_api_version, RegionReporter, Transition};

pub const SILENCE_LEVEL: &str = "silence-level";

pub const PARAM_SILENCE_THRESHOLD: &str = "silencethreshold";

/// Per-stream state allocated by `initialise`
struct SilenceTracker {
    geometry: StreamGeometry,
    frames: FrameBuffer,
    refiner: BoundaryRefiner,
    first: bool,
    previous_silent: bool,
    last_timestamp: RealTime,
}

impl SilenceTracker {
    fn new(geometry: StreamGeometry) -> Self {
        Self {
            geometry,
            frames: FrameBuffer::new(geometry.channels, geometry.step_size),
            refiner: BoundaryRefiner::new(geometry.step_size),
            first: true,
            previous_silent: false,
            last_timestamp: RealTime::ZERO,
        }
    }

    fn reset(&mut self) {
        self.frames.clear();
        self.first = true;
        self.previous_silent = false;
        self.last_timestamp = RealTime::ZERO;
    }
}

/// Silence detector plugin
pub struct SilencePlugin {
    input_sample_rate: f32,
    api_version: u32,
    classifier: SilenceClassifier,
    reporter: Box<dyn RegionReporter>,
    tracker: Option<SilenceTracker>,
}

impl SilencePlugin {
    /// Create a silence detector for a host speaking `api_version`
    pub fn new(input_sample_rate: f32, api_version: u32) -> Self {
        Self::with_config(
            input_sample_rate,
            SilenceConfig {
                api_version,
                ..SilenceConfig::default()
            },
        )
    }

    pub fn with_config(input_sample_rate: f32, config: SilenceConfig) -> Self {
        if config.api_version <= 1 {
            log::warn!(
                "[Silence] Using compatibility version 1 of the host API: \
                 regions are reported as start/end instants without durations"
            );
        }
        Self {
            input_sample_rate,
            api_version: config.api_version,
            classifier: SilenceClassifier::new(config.threshold_db),
            reporter: reporter_for_api_version(config.api_version),
            tracker: None,
        }
    }

    pub fn api_version(&self) -> u32 {
        self.api_version
    }

    pub fn threshold_db(&self) -> f32 {
        self.classifier.threshold_db()
    }

    /// Timestamp of a transition detected in the current step
    fn transition_time(
        &self,
        tracker: &SilenceTracker,
        silent: bool,
        timestamp: RealTime,
    ) -> RealTime {
        // A silent first block has nothing before it to refine against
        if tracker.first && silent {
            return timestamp;
        }
        let offset = tracker.refiner.refine(
            &self.classifier,
            tracker.frames.current(),
            tracker.frames.previous(),
            silent,
        );
        timestamp + RealTime::from_frames(offset, rounded_rate(self.input_sample_rate))
    }
}

impl Plugin for SilencePlugin {
    fn identifier(&self) -> &'static str {
        "silence"
    }

    fn name(&self) -> &'static str {
        "Silence Detector"
    }

    fn description(&self) -> &'static str {
        "Detect levels below a certain threshold"
    }

    fn maker(&self) -> &'static str {
        "onset_silence"
    }

    fn copyright(&self) -> &'static str {
        "GPL"
    }

    fn plugin_version(&self) -> u32 {
        if self.api_version <= 1 {
            2
        } else {
            3
        }
    }

    fn input_sample_rate(&self) -> f32 {
        self.input_sample_rate
    }

    fn preferred_step_size(&self) -> usize {
        1024
    }

    fn parameter_descriptors(&self) -> Vec<ParameterDescriptor> {
        vec![ParameterDescriptor {
            identifier: PARAM_SILENCE_THRESHOLD,
            name: "Silence Threshold",
            unit: "dB",
            min_value: -120.0,
            max_value: 0.0,
            default_value: DEFAULT_SILENCE_THRESHOLD_DB,
            quantize_step: None,
            value_names: Vec::new(),
        }]
    }

    fn parameter(&self, identifier: &str) -> Option<f32> {
        match identifier {
            PARAM_SILENCE_THRESHOLD => Some(self.classifier.threshold_db()),
            _ => None,
        }
    }

    fn set_parameter(&mut self, identifier: &str, value: f32) -> Result<(), PluginError> {
        if identifier != PARAM_SILENCE_THRESHOLD {
            return Err(PluginError::UnknownParameter {
                name: identifier.to_string(),
            });
        }
        if !(-120.0..=0.0).contains(&value) {
            return Err(PluginError::ParameterOutOfRange {
                name: identifier.to_string(),
                value,
                min: -120.0,
                max: 0.0,
            });
        }
        self.classifier.set_threshold_db(value);
        Ok(())
    }

    fn output_descriptors(&self) -> Vec<OutputDescriptor> {
        let mut outputs = self.reporter.outputs();

        let mut level = OutputDescriptor::new(
            SILENCE_LEVEL,
            "Silence Test",
            "Return a function that switches from 1 to 0 when silence falls, and back again when it ends",
            SampleType::VariableSampleRate,
        );
        level.bin_count = 1;
        level.extents = Some((0.0, 1.0));
        level.quantize_step = Some(1.0);
        outputs.push(level);

        outputs
    }

    fn initialise(
        &mut self,
        channels: usize,
        step_size: usize,
        block_size: usize,
    ) -> Result<(), PluginError> {
        let geometry = StreamGeometry::new(channels, step_size, block_size)?;
        let tracker = SilenceTracker::new(geometry);

        log::info!(
            "[Silence] Initialised: channels={}, step={}, block={}, increment={}, threshold={} dB",
            channels,
            step_size,
            block_size,
            tracker.refiner.increment(),
            self.classifier.threshold_db()
        );

        self.reporter.reset();
        self.tracker = Some(tracker);
        Ok(())
    }

    fn reset(&mut self) {
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.reset();
        }
        self.reporter.reset();
    }

    fn process(
        &mut self,
        input: &[&[f32]],
        timestamp: RealTime,
    ) -> Result<FeatureSet, PluginError> {
        let mut tracker = self.tracker.take().ok_or(PluginError::NotInitialised)?;
        if let Err(err) = tracker.geometry.check_input(input) {
            self.tracker = Some(tracker);
            return Err(err);
        }

        tracker.frames.write(input);
        let silent = self
            .classifier
            .classify(tracker.frames.current(), tracker.geometry.step_size);

        let mut features = FeatureSet::new();

        if tracker.first || tracker.previous_silent != silent {
            let stamp = self.transition_time(&tracker, silent, timestamp);
            tracing::debug!(
                "[Silence] {} at {} (block {})",
                if silent { "Silence" } else { "Sound" },
                stamp,
                timestamp
            );

            features.push(
                SILENCE_LEVEL,
                Feature::with_values(vec![if silent { 0.0 } else { 1.0 }]).at(stamp),
            );
            self.reporter.report(
                &Transition {
                    timestamp: stamp,
                    silent,
                    first: tracker.first,
                },
                &mut features,
            );

            tracker.previous_silent = silent;
            tracker.first = false;
        }

        tracker.frames.rotate();
        tracker.last_timestamp = timestamp;
        self.tracker = Some(tracker);

        Ok(features)
    }

    /// Always empty.
    ///
    /// A silent region still open at end of stream is computed but not
    /// reported; it is logged at debug level only.
    fn remaining_features(&mut self) -> FeatureSet {
        if let Some(tracker) = self.tracker.as_ref() {
            if tracker.previous_silent {
                if let Some((output, feature)) = self
                    .reporter
                    .open_region(tracker.last_timestamp, tracker.previous_silent)
                {
                    tracing::debug!(
                        "[Silence] Trailing {} region from {:?} not reported",
                        output,
                        feature.timestamp
                    );
                }
            }
        }
        FeatureSet::new()
    }
}
