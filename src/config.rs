//! Configuration management for the detectors
//!
//! This module provides configuration loading from JSON files so that
//! detector parameters and host step sizes can be adjusted without
//! recompilation. Every field has a default matching the plugins'
//! declared parameter defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::analysis::onset_function::OnsetFunctionType;
use crate::analysis::silence::{DEFAULT_ONSET_VETO_THRESHOLD_DB, DEFAULT_SILENCE_THRESHOLD_DB};

/// Complete detector configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default)]
    pub onset: OnsetConfig,
    #[serde(default)]
    pub silence: SilenceConfig,
    #[serde(default)]
    pub host: HostConfig,
}

/// Onset detector parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnsetConfig {
    /// Onset detection function
    pub function: OnsetFunctionType,
    /// Peak picker threshold (0..1)
    pub peak_pick_threshold: f32,
    /// Onsets in blocks quieter than this (dB) are suppressed
    pub silence_threshold_db: f32,
}

impl Default for OnsetConfig {
    fn default() -> Self {
        Self {
            function: OnsetFunctionType::ModifiedKullbackLeibler,
            peak_pick_threshold: 0.3,
            silence_threshold_db: DEFAULT_ONSET_VETO_THRESHOLD_DB,
        }
    }
}

/// Silence detector parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SilenceConfig {
    /// Blocks quieter than this (dB) are silent
    pub threshold_db: f32,
    /// Host API version; 1 selects instant start/end markers
    pub api_version: u32,
}

impl Default for SilenceConfig {
    fn default() -> Self {
        Self {
            threshold_db: DEFAULT_SILENCE_THRESHOLD_DB,
            api_version: 2,
        }
    }
}

/// Host-side block sizing; `None` uses the plugin's preferred size
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub step_size: Option<usize>,
    pub block_size: Option<usize>,
}

impl DetectorConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or defaults if the file doesn't exist or
    /// the JSON is invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}
