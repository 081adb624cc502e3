// Feature and descriptor types exchanged with the host

use serde::Serialize;
use std::collections::BTreeMap;

use super::RealTime;

/// A single extracted feature
///
/// Features emitted once per step carry no timestamp; the host places
/// them at the block timestamp. Variable-rate features carry their own.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Feature {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<RealTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<RealTime>,
    pub values: Vec<f32>,
}

impl Feature {
    /// Instant marker without values
    pub fn marker() -> Self {
        Self::default()
    }

    pub fn with_values(values: Vec<f32>) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    pub fn at(mut self, timestamp: RealTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn lasting(mut self, duration: RealTime) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Features produced by one call, keyed by output identifier
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureSet {
    outputs: BTreeMap<&'static str, Vec<Feature>>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, output: &'static str, feature: Feature) {
        self.outputs.entry(output).or_default().push(feature);
    }

    /// Features emitted on `output` (empty if none)
    pub fn get(&self, output: &str) -> &[Feature] {
        self.outputs.get(output).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.values().all(Vec::is_empty)
    }

    pub fn len(&self) -> usize {
        self.outputs.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Feature)> + '_ {
        self.outputs
            .iter()
            .flat_map(|(output, features)| features.iter().map(move |f| (*output, f)))
    }
}

/// Describes a tunable parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterDescriptor {
    pub identifier: &'static str,
    pub name: &'static str,
    pub unit: &'static str,
    pub min_value: f32,
    pub max_value: f32,
    pub default_value: f32,
    /// Step for quantised parameters (`None` if continuous)
    pub quantize_step: Option<f32>,
    pub value_names: Vec<&'static str>,
}

impl ParameterDescriptor {
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min_value && value <= self.max_value
    }
}

/// How an output's features are spaced in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SampleType {
    /// One feature (or none) per process call, placed at the block timestamp
    OneSamplePerStep,
    /// Each feature carries its own timestamp
    VariableSampleRate,
}

/// Describes an output stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputDescriptor {
    pub identifier: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub unit: &'static str,
    pub bin_count: usize,
    /// Known value range as (min, max)
    pub extents: Option<(f32, f32)>,
    pub quantize_step: Option<f32>,
    pub sample_type: SampleType,
    pub has_duration: bool,
}

impl OutputDescriptor {
    pub(crate) fn new(
        identifier: &'static str,
        name: &'static str,
        description: &'static str,
        sample_type: SampleType,
    ) -> Self {
        Self {
            identifier,
            name,
            description,
            unit: "",
            bin_count: 0,
            extents: None,
            quantize_step: None,
            sample_type,
            has_duration: false,
        }
    }
}
