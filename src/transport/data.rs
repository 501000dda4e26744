//! Transport payload unit.
//!
//! An [`EdgeData`] is an ordered list of borrowed byte segments handed to a
//! backend in a single `send` call. It never copies segment bytes: each
//! segment borrows memory owned by the caller for the lifetime `'a`.

use std::fmt;

use super::error::{EdgeError, EdgeResult};
use super::info::InfoStore;
use crate::core::constants::TENSOR_SIZE_LIMIT;

type DestroyFn<'a> = Box<dyn FnOnce() + Send + 'a>;

/// One borrowed segment of a payload unit.
pub struct DataSegment<'a> {
    bytes: &'a [u8],
    destroy: Option<DestroyFn<'a>>,
}

impl<'a> DataSegment<'a> {
    /// The borrowed bytes.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the segment is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Drop for DataSegment<'_> {
    fn drop(&mut self) {
        if let Some(destroy) = self.destroy.take() {
            destroy();
        }
    }
}

impl fmt::Debug for DataSegment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSegment")
            .field("len", &self.bytes.len())
            .field("has_destroy", &self.destroy.is_some())
            .finish()
    }
}

/// Ordered payload unit of at most [`TENSOR_SIZE_LIMIT`] segments.
///
/// Segment destroy callbacks run when the unit is dropped, in insertion order.
#[derive(Debug, Default)]
pub struct EdgeData<'a> {
    segments: Vec<DataSegment<'a>>,
    info: InfoStore,
}

impl<'a> EdgeData<'a> {
    /// Create an empty payload unit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment.
    ///
    /// Empty segments and segments beyond [`TENSOR_SIZE_LIMIT`] are rejected;
    /// a rejected segment's destroy callback still runs.
    pub fn add(&mut self, bytes: &'a [u8], destroy: Option<DestroyFn<'a>>) -> EdgeResult<()> {
        let segment = DataSegment { bytes, destroy };
        if segment.is_empty() {
            return Err(EdgeError::InvalidParameter(format!(
                "segment {} is empty",
                self.segments.len()
            )));
        }
        if self.segments.len() >= TENSOR_SIZE_LIMIT {
            return Err(EdgeError::DataLimit {
                limit: TENSOR_SIZE_LIMIT,
            });
        }
        self.segments.push(segment);
        Ok(())
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the unit holds no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segment bytes at `index`.
    pub fn segment(&self, index: usize) -> Option<&'a [u8]> {
        self.segments.get(index).map(DataSegment::bytes)
    }

    /// Iterate segment bytes in order.
    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        self.segments.iter().map(DataSegment::bytes)
    }

    /// Sum of all segment lengths.
    pub fn total_size(&self) -> usize {
        self.segments.iter().map(DataSegment::len).sum()
    }

    /// Attach a per-unit info entry.
    pub fn set_info(&mut self, key: &str, value: &str) -> EdgeResult<()> {
        self.info.set(key, value)
    }

    /// Per-unit info entry.
    pub fn get_info(&self, key: &str) -> Option<&str> {
        self.info.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_add_preserves_order_without_copy() {
        let first = b"hello".to_vec();
        let second = b"world!".to_vec();

        let mut data = EdgeData::new();
        data.add(&first, None).unwrap();
        data.add(&second, None).unwrap();

        assert_eq!(data.len(), 2);
        assert_eq!(data.total_size(), 11);
        assert_eq!(data.segment(0).unwrap().as_ptr(), first.as_ptr());
        assert_eq!(data.iter().collect::<Vec<_>>(), vec![&first[..], &second[..]]);
    }

    #[test]
    fn test_empty_segment_rejected() {
        let mut data = EdgeData::new();
        assert!(matches!(
            data.add(&[], None),
            Err(EdgeError::InvalidParameter(_))
        ));
        assert!(data.is_empty());
    }

    #[test]
    fn test_limit_enforced() {
        let byte = [7u8];
        let mut data = EdgeData::new();
        for _ in 0..TENSOR_SIZE_LIMIT {
            data.add(&byte, None).unwrap();
        }
        assert!(matches!(
            data.add(&byte, None),
            Err(EdgeError::DataLimit { limit: TENSOR_SIZE_LIMIT })
        ));
        assert_eq!(data.len(), TENSOR_SIZE_LIMIT);
    }

    #[test]
    fn test_destroy_runs_on_drop_and_on_reject() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let bytes = [1u8, 2, 3];

        let mut data = EdgeData::new();
        let counter = Arc::clone(&destroyed);
        data.add(
            &bytes,
            Some(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        )
        .unwrap();

        let counter = Arc::clone(&destroyed);
        let rejected = data.add(
            &[],
            Some(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        );
        assert!(rejected.is_err());
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);

        drop(data);
        assert_eq!(destroyed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unit_info() {
        let mut data = EdgeData::new();
        data.set_info("client_id", "7").unwrap();
        assert_eq!(data.get_info("CLIENT_ID"), Some("7"));
    }
}
