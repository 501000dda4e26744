//! Error types for the sink components.
//!
//! Only [`LifecycleError`] is fatal to a stream. Everything that goes wrong
//! with a single buffer is reported per buffer and the stream keeps running.

use thiserror::Error;

use super::lifecycle::ControllerState;
use crate::core::{ConfigError, MapError};
use crate::transport::{ConnectType, EdgeError};

/// A single segment could not be made available for reading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SegmentError {
    /// The buffer declared more segments than it can hand out.
    #[error("segment {index} is missing from the buffer")]
    Missing {
        /// Index of the missing segment.
        index: usize,
    },

    /// Mapping the segment for read access failed.
    #[error("cannot map segment {index}: {source}")]
    Map {
        /// Index of the failed segment.
        index: usize,
        /// Underlying map failure.
        #[source]
        source: MapError,
    },
}

impl SegmentError {
    /// Index of the segment that failed.
    pub fn index(&self) -> usize {
        match self {
            SegmentError::Missing { index } | SegmentError::Map { index, .. } => *index,
        }
    }
}

/// Errors that prevent extraction from starting.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// The buffer holds more segments than a payload unit can carry.
    #[error("buffer has {count} segments, limit is {limit}")]
    TooManySegments {
        /// Declared segment count.
        count: usize,
        /// Maximum segment count.
        limit: usize,
    },
}

/// Errors while building or sending a payload unit.
#[derive(Debug, Error)]
pub enum PackError {
    /// A segment could not be appended to the payload unit.
    #[error("failed to append segment {index}: {source}")]
    Append {
        /// Index of the rejected segment.
        index: usize,
        /// Transport error.
        #[source]
        source: EdgeError,
    },

    /// The transport rejected the payload unit.
    #[error("failed to send payload unit: {0}")]
    Send(#[source] EdgeError),
}

/// Why a buffer was dropped without being delivered.
#[derive(Debug, Error)]
pub enum DropReason {
    /// Extraction was refused.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// A segment could not be mapped.
    #[error(transparent)]
    Segment(#[from] SegmentError),

    /// Packing or sending failed.
    #[error(transparent)]
    Pack(#[from] PackError),
}

/// Errors from the transport lifecycle.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Configuration rejected before any handle was created.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The backend handle could not be created.
    #[error("failed to create {kind} transport: {source}")]
    Create {
        /// Requested backend kind.
        kind: ConnectType,
        /// Factory error.
        #[source]
        source: EdgeError,
    },

    /// The transport's start command failed.
    #[error("failed to start transport: {0}")]
    Start(#[source] EdgeError),

    /// The transport's stop command failed.
    #[error("failed to stop transport: {0}")]
    Stop(#[source] EdgeError),

    /// The operation is not valid in the current state.
    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        /// Rejected operation.
        operation: &'static str,
        /// State at the time of the call.
        state: ControllerState,
    },
}

impl LifecycleError {
    /// Check if this error happened before a transport handle existed.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            LifecycleError::Config(_) | LifecycleError::Create { .. }
        )
    }
}

/// Errors that reject a buffer before it reaches the transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// No transport is running.
    #[error("sink is not started")]
    NotStarted,

    /// Waiting for a subscriber connection failed.
    #[error("no connection within {timeout_ms} ms")]
    NotConnected {
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },
}
