// Plugin error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Plugin error code constants
///
/// Error code range: 2001-2006
pub struct PluginErrorCodes {}

impl PluginErrorCodes {
    /// `process` called before a successful `initialise`
    pub const NOT_INITIALISED: i32 = 2001;

    /// Channel count, step size or block size is structurally invalid
    pub const INVALID_GEOMETRY: i32 = 2002;

    /// Number of input channels differs from the initialised channel count
    pub const CHANNEL_COUNT_MISMATCH: i32 = 2003;

    /// An input channel holds fewer samples than the step size
    pub const BLOCK_LENGTH_MISMATCH: i32 = 2004;

    /// Parameter identifier is not known to the plugin
    pub const UNKNOWN_PARAMETER: i32 = 2005;

    /// Parameter value lies outside its declared range
    pub const PARAMETER_OUT_OF_RANGE: i32 = 2006;
}

/// Log a plugin error with structured context
///
/// Logs the numeric code, the plugin the error came from and the
/// human-readable message.
pub fn log_plugin_error(err: &PluginError, context: &str) {
    error!(
        "Plugin error in {}: code={}, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised by the plugin contract
///
/// All of these are precondition violations on the host side: the
/// detectors themselves have no transient failure mode.
#[derive(Debug, Clone, PartialEq)]
pub enum PluginError {
    /// `process` called before `initialise`
    NotInitialised,

    /// Zero channels, zero step size or zero block size
    InvalidGeometry {
        channels: usize,
        step_size: usize,
        block_size: usize,
    },

    /// Host delivered a different number of channels than initialised
    ChannelCountMismatch { expected: usize, actual: usize },

    /// A channel slice is shorter than the step size
    BlockLengthMismatch {
        channel: usize,
        expected: usize,
        actual: usize,
    },

    /// Parameter identifier is not known
    UnknownParameter { name: String },

    /// Parameter value outside its declared range
    ParameterOutOfRange {
        name: String,
        value: f32,
        min: f32,
        max: f32,
    },
}

impl ErrorCode for PluginError {
    fn code(&self) -> i32 {
        match self {
            PluginError::NotInitialised => PluginErrorCodes::NOT_INITIALISED,
            PluginError::InvalidGeometry { .. } => PluginErrorCodes::INVALID_GEOMETRY,
            PluginError::ChannelCountMismatch { .. } => PluginErrorCodes::CHANNEL_COUNT_MISMATCH,
            PluginError::BlockLengthMismatch { .. } => PluginErrorCodes::BLOCK_LENGTH_MISMATCH,
            PluginError::UnknownParameter { .. } => PluginErrorCodes::UNKNOWN_PARAMETER,
            PluginError::ParameterOutOfRange { .. } => PluginErrorCodes::PARAMETER_OUT_OF_RANGE,
        }
    }

    fn message(&self) -> String {
        match self {
            PluginError::NotInitialised => {
                "Plugin not initialised. Call initialise() before process().".to_string()
            }
            PluginError::InvalidGeometry {
                channels,
                step_size,
                block_size,
            } => format!(
                "Invalid geometry: channels={}, step_size={}, block_size={} (all must be > 0)",
                channels, step_size, block_size
            ),
            PluginError::ChannelCountMismatch { expected, actual } => {
                format!("Expected {} input channels, got {}", expected, actual)
            }
            PluginError::BlockLengthMismatch {
                channel,
                expected,
                actual,
            } => format!(
                "Channel {} holds {} samples, step size is {}",
                channel, actual, expected
            ),
            PluginError::UnknownParameter { name } => {
                format!("Unknown parameter '{}'", name)
            }
            PluginError::ParameterOutOfRange {
                name,
                value,
                min,
                max,
            } => format!(
                "Parameter '{}' value {} outside range [{}, {}]",
                name, value, min, max
            ),
        }
    }
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PluginError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for PluginError {}
