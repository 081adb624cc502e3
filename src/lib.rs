// Onset Silence - onset and silence detectors for block-based audio hosts
//
// Two streaming feature extractors sharing one host contract:
// - plugins::OnsetPlugin: spectral onset detection with peak picking
// - plugins::SilencePlugin: silent/non-silent regions at sub-block precision

// Module declarations
pub mod analysis;
pub mod config;
pub mod error;
pub mod host;
pub mod plugin;
pub mod plugins;

// Re-exports for convenience
pub use config::DetectorConfig;
pub use error::{ErrorCode, PluginError};
pub use host::{PluginRunner, StampedFeature};
pub use plugin::{Feature, FeatureSet, Plugin, RealTime};
pub use plugins::{OnsetPlugin, SilencePlugin};
