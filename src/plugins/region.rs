// Region output formats for the silence detector
//
// The transition detection core is shared; how regions are reported is
// chosen once at construction from the host API version:
// - API version 1 hosts have no durations, so each transition becomes an
//   instant `silence-start` or `silence-end` marker.
// - Later hosts get one durationed interval per completed region on
//   `silent` or `noisy`.

use crate::plugin::{Feature, FeatureSet, OutputDescriptor, RealTime, SampleType};

pub const SILENT: &str = "silent";
pub const NOISY: &str = "noisy";
pub const SILENCE_START: &str = "silence-start";
pub const SILENCE_END: &str = "silence-end";

/// A refined change of silence state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Refined time of the change
    pub timestamp: RealTime,
    /// State being entered
    pub silent: bool,
    /// First classified block of the stream (no previous region)
    pub first: bool,
}

/// Turns transitions into region features
pub trait RegionReporter: Send {
    fn outputs(&self) -> Vec<OutputDescriptor>;

    fn report(&mut self, transition: &Transition, features: &mut FeatureSet);

    /// Region still open at end of stream, if this format can express it
    fn open_region(&self, end: RealTime, silent: bool) -> Option<(&'static str, Feature)>;

    fn reset(&mut self);
}

/// Select the reporter for a host API version
pub fn reporter_for_api_version(api_version: u32) -> Box<dyn RegionReporter> {
    if api_version <= 1 {
        Box::new(InstantMarkers)
    } else {
        Box::new(Intervals::default())
    }
}

fn variable_rate(
    identifier: &'static str,
    name: &'static str,
    description: &'static str,
) -> OutputDescriptor {
    OutputDescriptor::new(identifier, name, description, SampleType::VariableSampleRate)
}

/// Instant start/end markers
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantMarkers;

impl RegionReporter for InstantMarkers {
    fn outputs(&self) -> Vec<OutputDescriptor> {
        vec![
            variable_rate(
                SILENCE_START,
                "Beginnings of Silent Regions",
                "Return a single instant at the point where each silent region begins",
            ),
            variable_rate(
                SILENCE_END,
                "Ends of Silent Regions",
                "Return a single instant at the point where each silent region ends",
            ),
        ]
    }

    fn report(&mut self, transition: &Transition, features: &mut FeatureSet) {
        let output = if transition.silent {
            SILENCE_START
        } else {
            SILENCE_END
        };
        features.push(output, Feature::marker().at(transition.timestamp));
    }

    fn open_region(&self, _end: RealTime, _silent: bool) -> Option<(&'static str, Feature)> {
        None
    }

    fn reset(&mut self) {}
}

/// Durationed intervals for completed regions
#[derive(Debug, Clone, Copy, Default)]
pub struct Intervals {
    last_change: RealTime,
}

impl RegionReporter for Intervals {
    fn outputs(&self) -> Vec<OutputDescriptor> {
        let mut silent = variable_rate(
            SILENT,
            "Silent Regions",
            "Return an interval covering each silent region",
        );
        silent.has_duration = true;
        let mut noisy = variable_rate(
            NOISY,
            "Non-Silent Regions",
            "Return an interval covering each non-silent region",
        );
        noisy.has_duration = true;
        vec![silent, noisy]
    }

    fn report(&mut self, transition: &Transition, features: &mut FeatureSet) {
        if !transition.first {
            // The region being left is the opposite of the state being entered
            let output = if transition.silent { NOISY } else { SILENT };
            features.push(
                output,
                Feature::marker()
                    .at(self.last_change)
                    .lasting(transition.timestamp - self.last_change),
            );
        }
        self.last_change = transition.timestamp;
    }

    fn open_region(&self, end: RealTime, silent: bool) -> Option<(&'static str, Feature)> {
        if end <= self.last_change {
            return None;
        }
        let output = if silent { SILENT } else { NOISY };
        Some((
            output,
            Feature::marker()
                .at(self.last_change)
                .lasting(end - self.last_change),
        ))
    }

    fn reset(&mut self) {
        self.last_change = RealTime::ZERO;
    }
}
