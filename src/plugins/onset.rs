// OnsetPlugin - onset detector
//
// Per step: copy input → phase vocoder → onset detection function →
// peak picker → silence veto. Emits an instant marker on `onsets` for
// each accepted peak and the raw detection value of every channel on
// `detection-function` for every step.
//
// The detection function type and peak-pick threshold are baked into
// the pipeline at `initialise`; changing them afterwards takes effect at
// the next `initialise`. The silence veto threshold applies immediately.

use crate::analysis::silence::DEFAULT_ONSET_VETO_THRESHOLD_DB;
use crate::analysis::{
    FrameBuffer, OnsetFunction, OnsetFunctionType, PeakPicker, PhaseVocoder, SilenceClassifier,
};
use crate::config::OnsetConfig;
use crate::error::PluginError;
use crate::plugin::{
    Feature, FeatureSet, OutputDescriptor, ParameterDescriptor, Plugin, RealTime, SampleType,
    StreamGeometry,
};

pub const ONSETS: &str = "onsets";
pub const DETECTION_FUNCTION: &str = "detection-function";

pub const PARAM_ONSET_TYPE: &str = "onsettype";
pub const PARAM_PEAK_PICK_THRESHOLD: &str = "peakpickthreshold";
pub const PARAM_SILENCE_THRESHOLD: &str = "silencethreshold";

/// Per-stream state allocated by `initialise`
struct OnsetPipeline {
    geometry: StreamGeometry,
    frames: FrameBuffer,
    vocoder: PhaseVocoder,
    function: OnsetFunction,
    picker: PeakPicker,
    values: Vec<f32>,
}

impl OnsetPipeline {
    fn new(geometry: StreamGeometry, config: &OnsetConfig) -> Self {
        let window_size = config.function.window_size(geometry.step_size);
        let vocoder = PhaseVocoder::new(window_size, geometry.step_size, geometry.channels);
        let bins = vocoder.window_size() / 2 + 1;

        Self {
            geometry,
            frames: FrameBuffer::new(geometry.channels, geometry.step_size),
            vocoder,
            function: OnsetFunction::new(config.function, geometry.channels, bins),
            picker: PeakPicker::new(config.peak_pick_threshold),
            values: vec![0.0; geometry.channels],
        }
    }

    fn reset(&mut self) {
        self.frames.clear();
        self.vocoder.reset();
        self.function.reset();
        self.picker.reset();
        self.values.fill(0.0);
    }
}

/// Onset detector plugin
pub struct OnsetPlugin {
    input_sample_rate: f32,
    config: OnsetConfig,
    pipeline: Option<OnsetPipeline>,
}

impl OnsetPlugin {
    pub fn new(input_sample_rate: f32) -> Self {
        Self::with_config(input_sample_rate, OnsetConfig::default())
    }

    pub fn with_config(input_sample_rate: f32, config: OnsetConfig) -> Self {
        Self {
            input_sample_rate,
            config,
            pipeline: None,
        }
    }

    pub fn config(&self) -> &OnsetConfig {
        &self.config
    }

    /// Detection function the running pipeline was built with
    pub fn active_function(&self) -> Option<OnsetFunctionType> {
        self.pipeline.as_ref().map(|p| p.function.kind())
    }

    fn check_range(&self, identifier: &str, value: f32) -> Result<(), PluginError> {
        match self
            .parameter_descriptors()
            .into_iter()
            .find(|d| d.identifier == identifier)
        {
            Some(descriptor) if descriptor.contains(value) => Ok(()),
            Some(descriptor) => Err(PluginError::ParameterOutOfRange {
                name: identifier.to_string(),
                value,
                min: descriptor.min_value,
                max: descriptor.max_value,
            }),
            None => Err(PluginError::UnknownParameter {
                name: identifier.to_string(),
            }),
        }
    }
}

impl Plugin for OnsetPlugin {
    fn identifier(&self) -> &'static str {
        "onset"
    }

    fn name(&self) -> &'static str {
        "Onset Detector"
    }

    fn description(&self) -> &'static str {
        "Detect note onsets using a selectable spectral detection function"
    }

    fn maker(&self) -> &'static str {
        "onset_silence"
    }

    fn copyright(&self) -> &'static str {
        "GPL"
    }

    fn plugin_version(&self) -> u32 {
        1
    }

    fn input_sample_rate(&self) -> f32 {
        self.input_sample_rate
    }

    fn preferred_step_size(&self) -> usize {
        self.config.function.preferred_step_size()
    }

    fn parameter_descriptors(&self) -> Vec<ParameterDescriptor> {
        vec![
            ParameterDescriptor {
                identifier: PARAM_ONSET_TYPE,
                name: "Onset Detection Function Type",
                unit: "",
                min_value: 0.0,
                max_value: 6.0,
                default_value: OnsetFunctionType::ModifiedKullbackLeibler.index() as f32,
                quantize_step: Some(1.0),
                value_names: OnsetFunctionType::VALUE_NAMES.to_vec(),
            },
            ParameterDescriptor {
                identifier: PARAM_PEAK_PICK_THRESHOLD,
                name: "Peak Picker Threshold",
                unit: "",
                min_value: 0.0,
                max_value: 1.0,
                default_value: 0.3,
                quantize_step: None,
                value_names: Vec::new(),
            },
            ParameterDescriptor {
                identifier: PARAM_SILENCE_THRESHOLD,
                name: "Silence Threshold",
                unit: "dB",
                min_value: -120.0,
                max_value: 0.0,
                default_value: DEFAULT_ONSET_VETO_THRESHOLD_DB,
                quantize_step: None,
                value_names: Vec::new(),
            },
        ]
    }

    fn parameter(&self, identifier: &str) -> Option<f32> {
        match identifier {
            PARAM_ONSET_TYPE => Some(self.config.function.index() as f32),
            PARAM_PEAK_PICK_THRESHOLD => Some(self.config.peak_pick_threshold),
            PARAM_SILENCE_THRESHOLD => Some(self.config.silence_threshold_db),
            _ => None,
        }
    }

    fn set_parameter(&mut self, identifier: &str, value: f32) -> Result<(), PluginError> {
        self.check_range(identifier, value)?;

        match identifier {
            PARAM_ONSET_TYPE => {
                let function = OnsetFunctionType::from_index(value).ok_or_else(|| {
                    PluginError::ParameterOutOfRange {
                        name: identifier.to_string(),
                        value,
                        min: 0.0,
                        max: 6.0,
                    }
                })?;
                self.config.function = function;
                if self.pipeline.is_some() {
                    log::info!(
                        "[Onset] Detection function set to {}; takes effect at next initialise",
                        function
                    );
                }
            }
            PARAM_PEAK_PICK_THRESHOLD => {
                self.config.peak_pick_threshold = value;
                if self.pipeline.is_some() {
                    log::info!(
                        "[Onset] Peak pick threshold set to {}; takes effect at next initialise",
                        value
                    );
                }
            }
            _ => self.config.silence_threshold_db = value,
        }

        Ok(())
    }

    fn output_descriptors(&self) -> Vec<OutputDescriptor> {
        let channels = self.pipeline.as_ref().map_or(1, |p| p.geometry.channels);

        let onsets =
            OutputDescriptor::new(ONSETS, "Onsets", "Onsets", SampleType::OneSamplePerStep);

        let mut detection = OutputDescriptor::new(
            DETECTION_FUNCTION,
            "Onset Detection Function",
            "Onset detection function value per channel",
            SampleType::OneSamplePerStep,
        );
        detection.bin_count = channels;

        vec![onsets, detection]
    }

    fn initialise(
        &mut self,
        channels: usize,
        step_size: usize,
        block_size: usize,
    ) -> Result<(), PluginError> {
        let geometry = StreamGeometry::new(channels, step_size, block_size)?;
        let pipeline = OnsetPipeline::new(geometry, &self.config);

        log::info!(
            "[Onset] Initialised: channels={}, step={}, block={}, window={}, function={}",
            channels,
            step_size,
            block_size,
            pipeline.vocoder.window_size(),
            self.config.function
        );

        self.pipeline = Some(pipeline);
        Ok(())
    }

    fn reset(&mut self) {
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.reset();
        }
    }

    fn process(
        &mut self,
        input: &[&[f32]],
        timestamp: RealTime,
    ) -> Result<FeatureSet, PluginError> {
        let pipeline = self.pipeline.as_mut().ok_or(PluginError::NotInitialised)?;
        pipeline.geometry.check_input(input)?;

        pipeline.frames.write(input);
        let spectrum = pipeline.vocoder.analyze(pipeline.frames.current());
        pipeline.function.compute(spectrum, &mut pipeline.values);

        let mut is_onset = pipeline.picker.pick(pipeline.values[0]);

        if is_onset {
            let veto = SilenceClassifier::new(self.config.silence_threshold_db);
            if veto.classify(pipeline.frames.current(), pipeline.geometry.step_size) {
                tracing::trace!("[Onset] Peak at {} vetoed by silence test", timestamp);
                is_onset = false;
            }
        }

        let mut features = FeatureSet::new();
        if is_onset {
            tracing::debug!("[Onset] Onset at {}", timestamp);
            features.push(ONSETS, Feature::marker());
        }
        features.push(
            DETECTION_FUNCTION,
            Feature::with_values(pipeline.values.clone()),
        );

        Ok(features)
    }

    fn remaining_features(&mut self) -> FeatureSet {
        FeatureSet::new()
    }
}
