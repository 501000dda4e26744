//! Error types for memory access and configuration.

use thiserror::Error;

/// Errors that can occur when mapping a memory region for reading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MapError {
    /// The memory does not allow read access.
    #[error("memory is not readable")]
    NotReadable,

    /// The requested view lies outside the parent memory.
    #[error("view {offset}+{size} exceeds memory of {available} bytes")]
    OutOfRange {
        /// Start of the view.
        offset: usize,
        /// Length of the view.
        size: usize,
        /// Size of the parent memory.
        available: usize,
    },
}

/// Errors in the sink configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Custom connect type selected without a backend library path.
    #[error("custom connect type requires a custom-lib path")]
    MissingCustomLibrary,

    /// Broker-style connect type selected without a destination host.
    #[error("{0} connect type requires a destination host")]
    MissingDestinationHost(&'static str),

    /// Unknown connect type name.
    #[error("unknown connect type: {0}")]
    UnknownConnectType(String),

    /// Configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
