// PhaseVocoder - sliding-window spectral analysis
//
// Each call shifts one step of new samples into a per-channel analysis
// window of `window_size` samples (2× or 4× the step), applies a Hann
// window and returns the magnitude/phase spectrum of the window.
//
// The FFT plan, scratch space and output frame are allocated once in
// `new`; `analyze` performs no heap allocation.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Magnitude and phase spectrum for every channel
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFrame {
    /// `norm[channel][bin]`
    pub norm: Vec<Vec<f32>>,
    /// `phase[channel][bin]`, radians in [-π, π]
    pub phase: Vec<Vec<f32>>,
}

impl SpectralFrame {
    pub fn new(channels: usize, bins: usize) -> Self {
        Self {
            norm: vec![vec![0.0; bins]; channels],
            phase: vec![vec![0.0; bins]; channels],
        }
    }

    pub fn channels(&self) -> usize {
        self.norm.len()
    }

    pub fn bins(&self) -> usize {
        self.norm.first().map_or(0, Vec::len)
    }
}

/// Phase vocoder analysis stage
pub struct PhaseVocoder {
    fft: Arc<dyn Fft<f32>>,
    window_size: usize,
    hop_size: usize,
    /// Hann window for FFT (pre-computed)
    window: Vec<f32>,
    /// Most recent `window_size` input samples per channel
    history: Vec<Vec<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    frame: SpectralFrame,
}

impl PhaseVocoder {
    /// Create a phase vocoder
    ///
    /// # Arguments
    /// * `window_size` - Analysis window length in samples
    /// * `hop_size` - New samples per call (the step size)
    /// * `channels` - Number of independent channels
    pub fn new(window_size: usize, hop_size: usize, channels: usize) -> Self {
        let window_size = window_size.max(2);
        let hop_size = hop_size.clamp(1, window_size);

        // Pre-compute Hann window to reduce spectral leakage
        let window = (0..window_size)
            .map(|i| {
                0.5 * (1.0
                    - ((2.0 * std::f32::consts::PI * i as f32) / (window_size as f32 - 1.0)).cos())
            })
            .collect();

        let fft = FftPlanner::new().plan_fft_forward(window_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Self {
            fft,
            window_size,
            hop_size,
            window,
            history: vec![vec![0.0; window_size]; channels],
            buffer: vec![Complex::new(0.0, 0.0); window_size],
            scratch,
            frame: SpectralFrame::new(channels, window_size / 2 + 1),
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Advance the window by one hop and return its spectrum
    ///
    /// `input[channel]` must hold at least `hop_size` samples; only the
    /// first `hop_size` are consumed.
    pub fn analyze<C: AsRef<[f32]>>(&mut self, input: &[C]) -> &SpectralFrame {
        let keep = self.window_size - self.hop_size;
        let bins = self.window_size / 2 + 1;

        for (channel, samples) in input.iter().enumerate().take(self.history.len()) {
            let history = &mut self.history[channel];
            history.copy_within(self.hop_size.., 0);
            history[keep..].copy_from_slice(&samples.as_ref()[..self.hop_size]);

            for ((slot, &sample), &w) in self
                .buffer
                .iter_mut()
                .zip(history.iter())
                .zip(self.window.iter())
            {
                *slot = Complex::new(sample * w, 0.0);
            }

            self.fft
                .process_with_scratch(&mut self.buffer, &mut self.scratch);

            let norm = &mut self.frame.norm[channel];
            let phase = &mut self.frame.phase[channel];
            for (bin, c) in self.buffer[..bins].iter().enumerate() {
                norm[bin] = c.norm();
                phase[bin] = c.arg();
            }
        }

        &self.frame
    }

    /// Forget all buffered input
    pub fn reset(&mut self) {
        for channel in self.history.iter_mut() {
            channel.fill(0.0);
        }
        for channel in self.frame.norm.iter_mut() {
            channel.fill(0.0);
        }
        for channel in self.frame.phase.iter_mut() {
            channel.fill(0.0);
        }
    }
}
