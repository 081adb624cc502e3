// Analysis module - DSP building blocks for the detectors
//
// Architecture:
// - Onset path: FrameBuffer → PhaseVocoder → OnsetFunction → PeakPicker,
//   with SilenceClassifier vetoing onsets in quiet blocks
// - Silence path: FrameBuffer → SilenceClassifier → BoundaryRefiner
//
// Every component allocates its buffers on construction and is reused
// for the lifetime of a stream.

pub mod boundary;
pub mod frame_buffer;
pub mod onset_function;
pub mod peak_picker;
pub mod phase_vocoder;
pub mod silence;

pub use boundary::BoundaryRefiner;
pub use frame_buffer::FrameBuffer;
pub use onset_function::{OnsetFunction, OnsetFunctionType};
pub use peak_picker::PeakPicker;
pub use phase_vocoder::{PhaseVocoder, SpectralFrame};
pub use silence::SilenceClassifier;
