// Plugins module - the two detectors exposed to hosts
//
// - OnsetPlugin: spectral onset detection with peak picking and a
//   silence veto
// - SilencePlugin: silent/non-silent regions with sub-block boundary
//   refinement, reported in the format the host API version supports

pub mod onset;
pub mod region;
pub mod silence;

pub use onset::OnsetPlugin;
pub use region::{reporter_for_api_version, RegionReporter, Transition};
pub use silence::SilencePlugin;

#[cfg(test)]
mod tests;
