// Silence classification
//
// A frame's level is the sum of squared samples over every channel,
// divided by the frame length. Converted to dB (10·log10) it is compared
// with a threshold; an all-zero frame is -inf dB and therefore silent.

use std::ops::Range;

/// Default threshold for standalone silence detection
pub const DEFAULT_SILENCE_THRESHOLD_DB: f32 = -80.0;

/// Default threshold for vetoing onsets in quiet blocks
pub const DEFAULT_ONSET_VETO_THRESHOLD_DB: f32 = -90.0;

/// Linear level of `range` across all channels
pub fn level_lin<C: AsRef<[f32]>>(channels: &[C], range: Range<usize>) -> f32 {
    let len = range.len();
    if len == 0 {
        return 0.0;
    }
    let energy: f32 = channels
        .iter()
        .map(|channel| {
            channel.as_ref()[range.clone()]
                .iter()
                .map(|s| s * s)
                .sum::<f32>()
        })
        .sum();
    energy / len as f32
}

/// Level of `range` in dB
pub fn level_db<C: AsRef<[f32]>>(channels: &[C], range: Range<usize>) -> f32 {
    10.0 * level_lin(channels, range).log10()
}

/// Stateless threshold test on a frame or part of one
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SilenceClassifier {
    threshold_db: f32,
}

impl SilenceClassifier {
    pub fn new(threshold_db: f32) -> Self {
        Self { threshold_db }
    }

    pub fn threshold_db(&self) -> f32 {
        self.threshold_db
    }

    pub fn set_threshold_db(&mut self, threshold_db: f32) {
        self.threshold_db = threshold_db;
    }

    /// Whether the first `len` samples of every channel are silent
    pub fn classify<C: AsRef<[f32]>>(&self, channels: &[C], len: usize) -> bool {
        self.classify_range(channels, 0..len)
    }

    /// Whether `range` of every channel is silent
    pub fn classify_range<C: AsRef<[f32]>>(&self, channels: &[C], range: Range<usize>) -> bool {
        level_db(channels, range) < self.threshold_db
    }
}

impl Default for SilenceClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_SILENCE_THRESHOLD_DB)
    }
}
