// PeakPicker - causal adaptive-threshold peak detection
//
// Keeps the last 7 detection-function values (5 older values, the
// candidate and 1 newer value), smooths them with a forward/backward
// bi-quad low-pass, and subtracts the window median plus `threshold × mean`. The three most
// recent thresholded values are kept; an onset is reported when the
// middle one is a positive strict local maximum.
//
// The candidate is one step behind the newest value and a peak is only
// confirmed one step after that, so onsets are reported two steps late.
// All buffers are allocated in `new`.

const LOOKBEHIND: usize = 5;
const LOOKAHEAD: usize = 1;
const WINDOW_LEN: usize = LOOKBEHIND + 1 + LOOKAHEAD;

/// Second-order IIR section (direct form I)
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b: [f32; 3],
    a: [f32; 2],
}

impl Biquad {
    /// Low-pass used to smooth the detection function
    const SMOOTHING: Biquad = Biquad {
        b: [0.1600, 0.3200, 0.1600],
        a: [-0.5949, 0.2348],
    };

    /// Filter `data` in place starting from zero state
    fn run(&self, data: &mut [f32]) {
        let (mut x1, mut x2, mut y1, mut y2) = (0.0_f32, 0.0_f32, 0.0_f32, 0.0_f32);
        for sample in data.iter_mut() {
            let x0 = *sample;
            let y0 = self.b[0] * x0 + self.b[1] * x1 + self.b[2] * x2
                - self.a[0] * y1
                - self.a[1] * y2;
            x2 = x1;
            x1 = x0;
            y2 = y1;
            y1 = y0;
            *sample = y0;
        }
    }

    /// Zero-phase filtering: forward pass, then backward pass
    fn filtfilt(&self, data: &mut [f32]) {
        self.run(data);
        data.reverse();
        self.run(data);
        data.reverse();
    }
}

/// Causal peak picker over a detection-function stream
#[derive(Debug, Clone)]
pub struct PeakPicker {
    threshold: f32,
    window: [f32; WINDOW_LEN],
    smoothed: [f32; WINDOW_LEN],
    sorted: [f32; WINDOW_LEN],
    peek: [f32; 3],
}

impl PeakPicker {
    /// Create a peak picker
    ///
    /// # Arguments
    /// * `threshold` - Weight of the window mean in the adaptive threshold (0..1)
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            window: [0.0; WINDOW_LEN],
            smoothed: [0.0; WINDOW_LEN],
            sorted: [0.0; WINDOW_LEN],
            peek: [0.0; 3],
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Feed one detection value; returns true when an onset is confirmed
    pub fn pick(&mut self, value: f32) -> bool {
        self.window.copy_within(1.., 0);
        self.window[WINDOW_LEN - 1] = value;

        self.smoothed = self.window;
        Biquad::SMOOTHING.filtfilt(&mut self.smoothed);

        let mean = self.smoothed.iter().sum::<f32>() / WINDOW_LEN as f32;

        self.sorted = self.smoothed;
        self.sorted
            .sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median = self.sorted[WINDOW_LEN / 2];

        let thresholded = self.smoothed[LOOKBEHIND] - median - mean * self.threshold;

        self.peek.copy_within(1.., 0);
        self.peek[2] = thresholded;

        self.peek[1] > self.peek[0] && self.peek[1] > self.peek[2] && self.peek[1] > 0.0
    }

    pub fn reset(&mut self) {
        self.window = [0.0; WINDOW_LEN];
        self.smoothed = [0.0; WINDOW_LEN];
        self.sorted = [0.0; WINDOW_LEN];
        self.peek = [0.0; 3];
    }
}
