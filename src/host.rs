//! Offline host for running a detector over a decoded signal.
//!
//! [`PluginRunner`] plays the role of a plugin host: it initialises the
//! plugin, slices the signal into steps, timestamps each block, and
//! collects every feature (including the end-of-stream flush) into a flat
//! list of [`StampedFeature`] records. [`read_wav`] decodes PCM WAV input
//! for the CLI.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use crate::config::HostConfig;
use crate::error::log_plugin_error;
use crate::plugin::{rounded_rate, Feature, Plugin, RealTime};

/// A feature with its output name and resolved timestamp
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StampedFeature {
    pub output: &'static str,
    pub timestamp: RealTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<RealTime>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<f32>,
}

/// Decoded multi-channel audio
#[derive(Debug, Clone, PartialEq)]
pub struct AudioData {
    pub sample_rate: u32,
    /// `channels[channel][frame]`
    pub channels: Vec<Vec<f32>>,
}

impl AudioData {
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }
}

/// Drives a [`Plugin`] over a whole signal
#[derive(Debug, Clone, Default)]
pub struct PluginRunner {
    step_size: Option<usize>,
    block_size: Option<usize>,
}

impl PluginRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &HostConfig) -> Self {
        Self {
            step_size: config.step_size,
            block_size: config.block_size,
        }
    }

    pub fn with_step_size(mut self, step_size: usize) -> Self {
        if step_size > 0 {
            self.step_size = Some(step_size);
        }
        self
    }

    /// Run `plugin` over `channels`, returning every feature in order
    ///
    /// Each call starts from freshly initialised plugin state. The last
    /// step is zero-padded; features without a timestamp take the
    /// timestamp of the block that produced them.
    pub fn run<P: Plugin + ?Sized>(
        &self,
        plugin: &mut P,
        channels: &[Vec<f32>],
    ) -> Result<Vec<StampedFeature>> {
        if channels.is_empty() {
            return Err(anyhow!("Signal has no channels"));
        }
        let frames = channels[0].len();
        if channels.iter().any(|c| c.len() != frames) {
            return Err(anyhow!("Channels have differing lengths"));
        }

        let step = self
            .step_size
            .unwrap_or_else(|| plugin.preferred_step_size());
        let block = self.block_size.unwrap_or(step).max(step);
        let rate = rounded_rate(plugin.input_sample_rate());

        if let Err(err) = plugin.initialise(channels.len(), step, block) {
            log_plugin_error(&err, "initialise");
            return Err(err)
                .with_context(|| format!("initialising {}", plugin.identifier()));
        }

        log::info!(
            "[Host] Running {} over {} frames x {} channels (step {}, block {})",
            plugin.identifier(),
            frames,
            channels.len(),
            step,
            block
        );

        let mut buffers = vec![vec![0.0f32; block]; channels.len()];
        let mut stamped = Vec::new();
        let mut start = 0usize;

        while start < frames {
            for (buffer, channel) in buffers.iter_mut().zip(channels) {
                let end = (start + block).min(frames);
                let filled = end - start;
                buffer[..filled].copy_from_slice(&channel[start..end]);
                buffer[filled..].fill(0.0);
            }
            let input: Vec<&[f32]> = buffers.iter().map(Vec::as_slice).collect();
            let timestamp = RealTime::from_frames(start as i64, rate);

            let features = match plugin.process(&input, timestamp) {
                Ok(features) => features,
                Err(err) => {
                    log_plugin_error(&err, "process");
                    return Err(err)
                        .with_context(|| format!("processing block at {}", timestamp));
                }
            };
            stamp_into(&mut stamped, features.iter(), timestamp);

            start += step;
        }

        let end = RealTime::from_frames(frames as i64, rate);
        stamp_into(&mut stamped, plugin.remaining_features().iter(), end);

        log::info!(
            "[Host] {} produced {} features",
            plugin.identifier(),
            stamped.len()
        );

        Ok(stamped)
    }
}

fn stamp_into<'a>(
    stamped: &mut Vec<StampedFeature>,
    features: impl Iterator<Item = (&'static str, &'a Feature)>,
    block_timestamp: RealTime,
) {
    stamped.extend(features.map(|(output, feature)| StampedFeature {
        output,
        timestamp: feature.timestamp.unwrap_or(block_timestamp),
        duration: feature.duration,
        values: feature.values.clone(),
    }));
}

/// Decode a PCM WAV file into per-channel float samples
pub fn read_wav(path: &Path) -> Result<AudioData> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    let channel_count = spec.channels as usize;
    if channel_count == 0 {
        return Err(anyhow!("{} has no channels", path.display()));
    }

    let interleaved = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map_err(|err| anyhow!(err)))
            .collect::<Result<Vec<f32>>>()?,
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            match spec.bits_per_sample {
                16 => reader
                    .samples::<i16>()
                    .map(|sample| {
                        sample
                            .map(|value| value as f32 / max)
                            .map_err(|err| anyhow!(err))
                    })
                    .collect::<Result<Vec<f32>>>()?,
                24 | 32 => reader
                    .samples::<i32>()
                    .map(|sample| {
                        sample
                            .map(|value| value as f32 / max)
                            .map_err(|err| anyhow!(err))
                    })
                    .collect::<Result<Vec<f32>>>()?,
                other => {
                    return Err(anyhow!(
                        "Unsupported bits per sample {} in {}",
                        other,
                        path.display()
                    ))
                }
            }
        }
    };

    let frames = interleaved.len() / channel_count;
    let mut channels: Vec<Vec<f32>> = (0..channel_count)
        .map(|_| Vec::with_capacity(frames))
        .collect();
    for frame in interleaved.chunks_exact(channel_count) {
        for (channel, &sample) in channels.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }

    log::debug!(
        "[Host] Decoded {}: {} Hz, {} channels, {} frames",
        path.display(),
        spec.sample_rate,
        channel_count,
        frames
    );

    Ok(AudioData {
        sample_rate: spec.sample_rate,
        channels,
    })
}
