// FrameBuffer - multi-channel step buffer with one step of look-back
//
// Two pre-allocated banks of `channels × step_size` samples. `write`
// copies the host's block into the current bank; `rotate` flips which
// bank is current so the block just processed becomes the previous one
// without copying or reallocating.

/// Owned double buffer holding the current and previous step
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    banks: [Vec<Vec<f32>>; 2],
    current: usize,
    step_size: usize,
}

impl FrameBuffer {
    /// Allocate both banks, zero-filled
    pub fn new(channels: usize, step_size: usize) -> Self {
        let bank = || vec![vec![0.0_f32; step_size]; channels];
        Self {
            banks: [bank(), bank()],
            current: 0,
            step_size,
        }
    }

    pub fn channels(&self) -> usize {
        self.banks[0].len()
    }

    pub fn step_size(&self) -> usize {
        self.step_size
    }

    /// Copy one step per channel into the current bank
    ///
    /// Only the first `step_size` samples of each input channel are read;
    /// the caller validates channel count and lengths.
    pub fn write(&mut self, input: &[&[f32]]) {
        for (dst, src) in self.banks[self.current].iter_mut().zip(input) {
            dst.copy_from_slice(&src[..self.step_size]);
        }
    }

    pub fn current(&self) -> &[Vec<f32>] {
        &self.banks[self.current]
    }

    pub fn previous(&self) -> &[Vec<f32>] {
        &self.banks[1 - self.current]
    }

    /// Make the current step the previous one
    pub fn rotate(&mut self) {
        self.current = 1 - self.current;
    }

    /// Zero both banks
    pub fn clear(&mut self) {
        for bank in self.banks.iter_mut() {
            for channel in bank.iter_mut() {
                channel.fill(0.0);
            }
        }
        self.current = 0;
    }
}
