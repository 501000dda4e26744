//! Segment extraction.
//!
//! Turns one logical buffer into an ordered list of mapped, read-only
//! segments. Tensor streams are addressed through the buffer's tensor
//! accessor; everything else uses its native memory regions.

use std::sync::Arc;

use super::error::{ExtractError, SegmentError};
use crate::core::constants::{LOG_TARGET, TENSOR_SIZE_LIMIT};
use crate::core::{Buffer, MappedMemory, Memory};

/// A mapped segment.
///
/// Dropping it unmaps the view, then releases the memory reference.
#[derive(Debug)]
pub struct Segment {
    map: MappedMemory,
    memory: Arc<dyn Memory>,
}

impl Segment {
    /// The mapped bytes.
    pub fn as_slice(&self) -> &[u8] {
        self.map.as_slice()
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the segment is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// The memory this segment was mapped from.
    pub fn memory(&self) -> &Arc<dyn Memory> {
        &self.memory
    }
}

/// Result of extracting a buffer.
///
/// When mapping stops early, `segments` holds exactly the segments mapped
/// before the failure and `failure` names the one that failed.
#[derive(Debug)]
pub struct Extraction {
    segments: Vec<Segment>,
    expected: usize,
    failure: Option<SegmentError>,
}

impl Extraction {
    /// Whether every declared segment was mapped.
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// Mapped segments, in buffer order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of successfully mapped segments.
    pub fn mapped_count(&self) -> usize {
        self.segments.len()
    }

    /// Number of segments the buffer declared.
    pub fn expected_count(&self) -> usize {
        self.expected
    }

    /// The failure that stopped extraction, if any.
    pub fn failure(&self) -> Option<&SegmentError> {
        self.failure.as_ref()
    }

    /// Complete segment list, or the failure. Partial segments are unmapped.
    pub fn into_result(self) -> Result<Vec<Segment>, SegmentError> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self.segments),
        }
    }
}

/// Extract the segments of `buffer`.
///
/// Fails without mapping anything when the declared count exceeds
/// [`TENSOR_SIZE_LIMIT`].
pub fn extract(buffer: &dyn Buffer, is_tensor_stream: bool) -> Result<Extraction, ExtractError> {
    let count = if is_tensor_stream {
        buffer.tensor_count()
    } else {
        buffer.n_memory()
    };

    if count > TENSOR_SIZE_LIMIT {
        return Err(ExtractError::TooManySegments {
            count,
            limit: TENSOR_SIZE_LIMIT,
        });
    }

    let mut segments = Vec::with_capacity(count);
    let mut failure = None;

    for index in 0..count {
        let memory = if is_tensor_stream {
            buffer.tensor_memory(index)
        } else {
            buffer.memory(index)
        };

        let Some(memory) = memory else {
            failure = Some(SegmentError::Missing { index });
            break;
        };

        match memory.map_readable() {
            Ok(map) => segments.push(Segment { map, memory }),
            Err(source) => {
                failure = Some(SegmentError::Map { index, source });
                break;
            }
        }
    }

    if let Some(err) = &failure {
        tracing::error!(
            target: LOG_TARGET,
            index = err.index(),
            mapped = segments.len(),
            error = %err,
            "cannot map segment"
        );
    }

    Ok(Extraction {
        segments,
        expected: count,
        failure,
    })
}
