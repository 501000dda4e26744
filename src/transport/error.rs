//! Edge transport error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors reported by an edge transport backend.
#[derive(Debug, Error)]
pub enum EdgeError {
    /// A parameter was rejected by the backend.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The requested backend or operation is not available.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// No custom backend is registered under the given library path.
    #[error("custom backend not found: {}", .0.display())]
    LibraryNotFound(PathBuf),

    /// The backend could not establish its endpoint.
    #[error("connection failure: {0}")]
    ConnectionFailure(String),

    /// The payload unit already holds the maximum number of segments.
    #[error("payload unit is full ({limit} segments)")]
    DataLimit {
        /// Maximum segment count.
        limit: usize,
    },

    /// Operation requires a started transport.
    #[error("transport not started")]
    NotStarted,

    /// Every subscriber failed to receive the payload unit.
    #[error("send failed for {failed} subscriber(s)")]
    SendFailed {
        /// Number of subscribers that were dropped.
        failed: usize,
    },

    /// I/O error (socket or runtime setup).
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// Backend specific failure.
    #[error("backend error: {0}")]
    Backend(String),
}

impl EdgeError {
    /// Check if this error means the peer side is unreachable.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            EdgeError::ConnectionFailure(_) | EdgeError::SendFailed { .. } | EdgeError::Io(_)
        )
    }

    /// Check if this error stems from how the transport was set up rather
    /// than from runtime conditions.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            EdgeError::InvalidParameter(_)
                | EdgeError::NotSupported(_)
                | EdgeError::LibraryNotFound(_)
        )
    }
}

/// Result type for transport operations.
pub type EdgeResult<T> = Result<T, EdgeError>;
