// Error types for the onset and silence detectors
//
// This module defines the error type returned by the plugin contract,
// providing structured error handling with numeric codes a host can map
// onto its own reporting.

mod plugin;

pub use plugin::{log_plugin_error, PluginError, PluginErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the host boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
