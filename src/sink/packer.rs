//! Data packing.
//!
//! Wraps extracted segments into one payload unit and hands it to the
//! transport. Segment bytes are borrowed, never copied; the unit is dropped
//! as soon as `send` returns.

use super::error::PackError;
use super::extract::Segment;
use crate::core::constants::LOG_TARGET;
use crate::transport::{EdgeData, EdgeTransport};

/// Build a payload unit borrowing every segment, in order.
pub fn pack(segments: &[Segment]) -> Result<EdgeData<'_>, PackError> {
    let mut data = EdgeData::new();
    for (index, segment) in segments.iter().enumerate() {
        data.add(segment.as_slice(), None).map_err(|source| {
            tracing::error!(target: LOG_TARGET, index, error = %source, "failed to append segment");
            PackError::Append { index, source }
        })?;
    }
    Ok(data)
}

/// Pack `segments` and send them with exactly one transport call.
///
/// Nothing is sent if any segment fails to pack.
pub fn pack_and_send(transport: &dyn EdgeTransport, segments: &[Segment]) -> Result<(), PackError> {
    let data = pack(segments)?;
    transport.send(&data).map_err(|source| {
        tracing::error!(
            target: LOG_TARGET,
            segments = data.len(),
            error = %source,
            "failed to send payload unit, connection lost or internal error"
        );
        PackError::Send(source)
    })
}
