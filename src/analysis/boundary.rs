// BoundaryRefiner - sub-block location of silence transitions
//
// Silence is classified once per step, so a transition is first seen at
// block resolution. The refiner rescans the step in short windows of
// `increment` samples (16, or step/8 for small steps) to find where the
// new state actually begins:
//
// - forward over the current step: the first window already in the new
//   state gives a non-negative offset;
// - into silence with nothing found past offset 0: backward over the tail
//   of the previous step, where the last non-silent window gives a
//   negative offset.
//
// Offsets are in frames relative to the start of the current step; 0
// means the transition sits on the block boundary.

use super::silence::SilenceClassifier;

const MAX_INCREMENT: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryRefiner {
    step_size: usize,
    increment: usize,
}

impl BoundaryRefiner {
    pub fn new(step_size: usize) -> Self {
        let increment = MAX_INCREMENT.min(step_size / 8).max(1);
        Self {
            step_size,
            increment,
        }
    }

    pub fn increment(&self) -> usize {
        self.increment
    }

    /// Frame offset of a transition into `now_silent` within the current step
    ///
    /// # Arguments
    /// * `classifier` - Same test used to classify whole steps
    /// * `current` - Step in which the new state was detected
    /// * `previous` - Step before it (only read for transitions into silence)
    /// * `now_silent` - The state being entered
    pub fn refine<C: AsRef<[f32]>>(
        &self,
        classifier: &SilenceClassifier,
        current: &[C],
        previous: &[C],
        now_silent: bool,
    ) -> i64 {
        let step = self.step_size;
        let incr = self.increment;

        let mut offset = 0_i64;
        let mut start = 0;
        while start + incr <= step {
            if classifier.classify_range(current, start..start + incr) == now_silent {
                offset = start as i64;
                break;
            }
            start += incr;
        }

        if now_silent && offset == 0 {
            let mut back = 0;
            while back + incr <= step {
                let end = step - back;
                if !classifier.classify_range(previous, end - incr..end) {
                    offset = -(back as i64);
                    break;
                }
                back += incr;
            }
        }

        offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(len: usize, loud: std::ops::Range<usize>) -> Vec<Vec<f32>> {
        let mut channel = vec![0.0_f32; len];
        channel[loud].fill(1.0);
        vec![channel]
    }

    #[test]
    fn test_increment_is_capped() {
        assert_eq!(BoundaryRefiner::new(1024).increment(), 16);
        assert_eq!(BoundaryRefiner::new(64).increment(), 8);
        assert_eq!(BoundaryRefiner::new(4).increment(), 1);
    }

    #[test]
    fn test_into_sound_finds_first_loud_window() {
        let refiner = BoundaryRefiner::new(1024);
        let classifier = SilenceClassifier::default();
        let previous = block(1024, 0..0);
        let current = block(1024, 300..1024);

        let offset = refiner.refine(&classifier, &current, &previous, false);
        assert_eq!(offset, 288);
    }

    #[test]
    fn test_into_silence_within_step() {
        let refiner = BoundaryRefiner::new(1024);
        let classifier = SilenceClassifier::default();
        let previous = block(1024, 0..1024);
        let current = block(1024, 0..500);

        let offset = refiner.refine(&classifier, &current, &previous, true);
        assert_eq!(offset, 512);
    }

    #[test]
    fn test_into_silence_at_boundary() {
        let refiner = BoundaryRefiner::new(1024);
        let classifier = SilenceClassifier::default();
        let previous = block(1024, 0..1024);
        let current = block(1024, 0..0);

        assert_eq!(refiner.refine(&classifier, &current, &previous, true), 0);
    }

    #[test]
    fn test_into_silence_before_boundary_looks_back() {
        let refiner = BoundaryRefiner::new(1024);
        let classifier = SilenceClassifier::default();
        // Silence starts 300 frames before the current step
        let previous = block(1024, 0..724);
        let current = block(1024, 0..0);

        let offset = refiner.refine(&classifier, &current, &previous, true);
        assert_eq!(offset, -288);
        assert!((offset + 300).abs() < refiner.increment() as i64);
    }

    #[test]
    fn test_no_boundary_defaults_to_zero() {
        let refiner = BoundaryRefiner::new(256);
        let classifier = SilenceClassifier::default();
        let silent = block(256, 0..0);

        assert_eq!(refiner.refine(&classifier, &silent, &silent, true), 0);
    }
}
