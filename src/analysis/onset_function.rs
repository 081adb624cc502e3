// Onset detection functions
//
// Reduces each spectral frame to one novelty value per channel. Seven
// formulas are available; each keeps its own per-channel history of the
// previous frame(s), so the formula is fixed when the detector is built.
//
// With m = magnitude, φ = phase, j = bin index and primes for earlier frames:
//   energy                Σ m²
//   spectral difference   Σ max(0, m - m')
//   HFC                   Σ (j + 1) · m
//   complex domain        Σ |X - m'·e^{i(2φ' - φ'')}|
//   phase deviation       mean |princarg(φ - 2φ' + φ'')| over bins with m > 0.1
//   Kullback-Leibler      Σ m · ln(1 + m / (m' + ε))
//   modified KL           Σ ln(1 + m / (m' + ε))

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;

use super::phase_vocoder::SpectralFrame;

const KL_EPSILON: f32 = 1.0e-10;

/// Magnitude below which a bin's phase is ignored by phase deviation
const PHASE_MAGNITUDE_FLOOR: f32 = 0.1;

/// Selectable onset detection function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OnsetFunctionType {
    #[serde(rename = "energy")]
    Energy,
    #[serde(rename = "spectral_difference")]
    SpectralDifference,
    #[serde(rename = "hfc")]
    HighFrequencyContent,
    #[serde(rename = "complex")]
    ComplexDomain,
    #[serde(rename = "phase")]
    PhaseDeviation,
    #[serde(rename = "kl")]
    KullbackLeibler,
    #[serde(rename = "mkl")]
    ModifiedKullbackLeibler,
}

impl OnsetFunctionType {
    pub const ALL: [OnsetFunctionType; 7] = [
        OnsetFunctionType::Energy,
        OnsetFunctionType::SpectralDifference,
        OnsetFunctionType::HighFrequencyContent,
        OnsetFunctionType::ComplexDomain,
        OnsetFunctionType::PhaseDeviation,
        OnsetFunctionType::KullbackLeibler,
        OnsetFunctionType::ModifiedKullbackLeibler,
    ];

    /// Value names in parameter order
    pub const VALUE_NAMES: [&'static str; 7] = [
        "Energy Based",
        "Spectral Difference",
        "High-Frequency Content",
        "Complex Domain",
        "Phase Deviation",
        "Kullback-Liebler",
        "Modified Kullback-Liebler",
    ];

    /// Map a parameter value (rounded to nearest) onto a function type
    pub fn from_index(value: f32) -> Option<Self> {
        let index = value.round();
        if !(0.0..=6.0).contains(&index) {
            return None;
        }
        Self::ALL.get(index as usize).copied()
    }

    pub fn index(self) -> usize {
        match self {
            OnsetFunctionType::Energy => 0,
            OnsetFunctionType::SpectralDifference => 1,
            OnsetFunctionType::HighFrequencyContent => 2,
            OnsetFunctionType::ComplexDomain => 3,
            OnsetFunctionType::PhaseDeviation => 4,
            OnsetFunctionType::KullbackLeibler => 5,
            OnsetFunctionType::ModifiedKullbackLeibler => 6,
        }
    }

    /// Energy and HFC react quickly and use a shorter analysis window
    pub fn uses_short_window(self) -> bool {
        matches!(
            self,
            OnsetFunctionType::Energy | OnsetFunctionType::HighFrequencyContent
        )
    }

    /// Analysis window length for a given step size
    pub fn window_size(self, step_size: usize) -> usize {
        if self.uses_short_window() {
            step_size * 2
        } else {
            step_size * 4
        }
    }

    /// Step size hint advertised to hosts
    pub fn preferred_step_size(self) -> usize {
        if self.uses_short_window() {
            512
        } else {
            128
        }
    }

    /// Name used in configuration files and on the command line
    pub fn short_name(self) -> &'static str {
        match self {
            OnsetFunctionType::Energy => "energy",
            OnsetFunctionType::SpectralDifference => "spectral_difference",
            OnsetFunctionType::HighFrequencyContent => "hfc",
            OnsetFunctionType::ComplexDomain => "complex",
            OnsetFunctionType::PhaseDeviation => "phase",
            OnsetFunctionType::KullbackLeibler => "kl",
            OnsetFunctionType::ModifiedKullbackLeibler => "mkl",
        }
    }
}

impl FromStr for OnsetFunctionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|function| function.short_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "unknown onset function '{}' (expected one of energy, spectral_difference, hfc, complex, phase, kl, mkl)",
                    s
                )
            })
    }
}

impl fmt::Display for OnsetFunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::VALUE_NAMES[self.index()])
    }
}

/// Wrap a phase into [-π, π)
pub fn princarg(phase: f32) -> f32 {
    let two_pi = 2.0 * PI;
    phase + two_pi * (1.0 + (-(phase + PI) / two_pi).floor())
}

/// Per-channel magnitude history
#[derive(Debug, Clone)]
pub struct MagnitudeHistory {
    previous: Vec<Vec<f32>>,
}

impl MagnitudeHistory {
    fn new(channels: usize, bins: usize) -> Self {
        Self {
            previous: vec![vec![0.0; bins]; channels],
        }
    }

    fn reset(&mut self) {
        for channel in self.previous.iter_mut() {
            channel.fill(0.0);
        }
    }
}

/// Per-channel magnitude plus two frames of phase history
#[derive(Debug, Clone)]
pub struct PhaseHistory {
    magnitude: Vec<Vec<f32>>,
    theta1: Vec<Vec<f32>>,
    theta2: Vec<Vec<f32>>,
}

impl PhaseHistory {
    fn new(channels: usize, bins: usize) -> Self {
        Self {
            magnitude: vec![vec![0.0; bins]; channels],
            theta1: vec![vec![0.0; bins]; channels],
            theta2: vec![vec![0.0; bins]; channels],
        }
    }

    fn reset(&mut self) {
        for buffers in [&mut self.magnitude, &mut self.theta1, &mut self.theta2] {
            for channel in buffers.iter_mut() {
                channel.fill(0.0);
            }
        }
    }

    /// Shift phases back one frame and remember the current magnitudes
    fn advance(&mut self, channel: usize, norm: &[f32], phase: &[f32]) {
        self.theta2[channel].copy_from_slice(&self.theta1[channel]);
        self.theta1[channel].copy_from_slice(phase);
        self.magnitude[channel].copy_from_slice(norm);
    }
}

/// Stateful onset detection function
///
/// Each variant owns exactly the history its formula needs.
#[derive(Debug, Clone)]
pub enum OnsetFunction {
    Energy,
    SpectralDifference(MagnitudeHistory),
    HighFrequencyContent,
    ComplexDomain(PhaseHistory),
    PhaseDeviation(PhaseHistory),
    KullbackLeibler(MagnitudeHistory),
    ModifiedKullbackLeibler(MagnitudeHistory),
}

impl OnsetFunction {
    /// Build a detection function for frames of `bins` bins
    pub fn new(kind: OnsetFunctionType, channels: usize, bins: usize) -> Self {
        match kind {
            OnsetFunctionType::Energy => OnsetFunction::Energy,
            OnsetFunctionType::SpectralDifference => {
                OnsetFunction::SpectralDifference(MagnitudeHistory::new(channels, bins))
            }
            OnsetFunctionType::HighFrequencyContent => OnsetFunction::HighFrequencyContent,
            OnsetFunctionType::ComplexDomain => {
                OnsetFunction::ComplexDomain(PhaseHistory::new(channels, bins))
            }
            OnsetFunctionType::PhaseDeviation => {
                OnsetFunction::PhaseDeviation(PhaseHistory::new(channels, bins))
            }
            OnsetFunctionType::KullbackLeibler => {
                OnsetFunction::KullbackLeibler(MagnitudeHistory::new(channels, bins))
            }
            OnsetFunctionType::ModifiedKullbackLeibler => {
                OnsetFunction::ModifiedKullbackLeibler(MagnitudeHistory::new(channels, bins))
            }
        }
    }

    pub fn kind(&self) -> OnsetFunctionType {
        match self {
            OnsetFunction::Energy => OnsetFunctionType::Energy,
            OnsetFunction::SpectralDifference(_) => OnsetFunctionType::SpectralDifference,
            OnsetFunction::HighFrequencyContent => OnsetFunctionType::HighFrequencyContent,
            OnsetFunction::ComplexDomain(_) => OnsetFunctionType::ComplexDomain,
            OnsetFunction::PhaseDeviation(_) => OnsetFunctionType::PhaseDeviation,
            OnsetFunction::KullbackLeibler(_) => OnsetFunctionType::KullbackLeibler,
            OnsetFunction::ModifiedKullbackLeibler(_) => {
                OnsetFunctionType::ModifiedKullbackLeibler
            }
        }
    }

    /// Compute one value per channel into `output` and update history
    pub fn compute(&mut self, frame: &SpectralFrame, output: &mut [f32]) {
        for (channel, value) in output.iter_mut().enumerate().take(frame.channels()) {
            let norm = &frame.norm[channel];
            let phase = &frame.phase[channel];
            *value = match self {
                OnsetFunction::Energy => norm.iter().map(|m| m * m).sum(),
                OnsetFunction::SpectralDifference(history) => {
                    let previous = &mut history.previous[channel];
                    let flux = norm
                        .iter()
                        .zip(previous.iter())
                        .map(|(curr, prev)| (curr - prev).max(0.0))
                        .sum();
                    previous.copy_from_slice(norm);
                    flux
                }
                OnsetFunction::HighFrequencyContent => norm
                    .iter()
                    .enumerate()
                    .map(|(j, m)| (j + 1) as f32 * m)
                    .sum(),
                OnsetFunction::ComplexDomain(history) => {
                    let value = complex_domain(
                        norm,
                        phase,
                        &history.magnitude[channel],
                        &history.theta1[channel],
                        &history.theta2[channel],
                    );
                    history.advance(channel, norm, phase);
                    value
                }
                OnsetFunction::PhaseDeviation(history) => {
                    let value = phase_deviation(
                        norm,
                        phase,
                        &history.theta1[channel],
                        &history.theta2[channel],
                    );
                    history.advance(channel, norm, phase);
                    value
                }
                OnsetFunction::KullbackLeibler(history) => {
                    let previous = &mut history.previous[channel];
                    let value: f32 = norm
                        .iter()
                        .zip(previous.iter())
                        .map(|(m, prev)| m * (1.0 + m / (prev + KL_EPSILON)).ln())
                        .sum();
                    previous.copy_from_slice(norm);
                    finite_or_zero(value)
                }
                OnsetFunction::ModifiedKullbackLeibler(history) => {
                    let previous = &mut history.previous[channel];
                    let value: f32 = norm
                        .iter()
                        .zip(previous.iter())
                        .map(|(m, prev)| (1.0 + m / (prev + KL_EPSILON)).ln())
                        .sum();
                    previous.copy_from_slice(norm);
                    finite_or_zero(value)
                }
            };
        }
    }

    /// Forget all spectral history
    pub fn reset(&mut self) {
        match self {
            OnsetFunction::Energy | OnsetFunction::HighFrequencyContent => {}
            OnsetFunction::SpectralDifference(history)
            | OnsetFunction::KullbackLeibler(history)
            | OnsetFunction::ModifiedKullbackLeibler(history) => history.reset(),
            OnsetFunction::ComplexDomain(history) | OnsetFunction::PhaseDeviation(history) => {
                history.reset()
            }
        }
    }
}

fn complex_domain(
    norm: &[f32],
    phase: &[f32],
    previous_norm: &[f32],
    theta1: &[f32],
    theta2: &[f32],
) -> f32 {
    let mut sum = 0.0;
    for j in 0..norm.len() {
        // Predicted bin keeps the previous magnitude and advances phase linearly
        let deviation = phase[j] - (2.0 * theta1[j] - theta2[j]);
        let m = norm[j];
        let p = previous_norm[j];
        let distance_sq = m * m + p * p - 2.0 * m * p * deviation.cos();
        sum += distance_sq.abs().sqrt();
    }
    sum
}

fn phase_deviation(norm: &[f32], phase: &[f32], theta1: &[f32], theta2: &[f32]) -> f32 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for j in 0..norm.len() {
        if norm[j] > PHASE_MAGNITUDE_FLOOR {
            sum += princarg(phase[j] - 2.0 * theta1[j] + theta2[j]).abs();
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value
    }
}
