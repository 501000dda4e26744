//! Core traits for buffers arriving from the upstream producer.
//!
//! A [`Buffer`] is one logical unit of stream data. It may be backed by several
//! discretely allocated [`Memory`] regions, and for tensor streams it may also
//! expose logically addressed tensor sub-segments that do not line up with its
//! native regions.

use std::fmt;
use std::sync::Arc;

use super::buffer::MappedMemory;
use super::error::MapError;

/// One discretely allocated memory region.
///
/// Implementations own (or share) their storage. Mapping hands out a read-only
/// view that keeps the storage alive until the view is dropped.
pub trait Memory: Send + Sync + fmt::Debug {
    /// Size of the region in bytes.
    fn size(&self) -> usize;

    /// Map the region for read access.
    ///
    /// The returned view is unmapped when dropped. A failed map leaves
    /// nothing to unmap.
    fn map_readable(&self) -> Result<MappedMemory, MapError>;
}

/// A logical buffer delivered by the upstream producer.
pub trait Buffer: Send + Sync {
    /// Number of native memory regions, in storage order.
    fn n_memory(&self) -> usize;

    /// Native memory region at `index`.
    fn memory(&self, index: usize) -> Option<Arc<dyn Memory>>;

    /// Declared number of tensor sub-segments.
    ///
    /// Defaults to one tensor per native memory region.
    fn tensor_count(&self) -> usize {
        self.n_memory()
    }

    /// Tensor sub-segment at `index`.
    fn tensor_memory(&self, index: usize) -> Option<Arc<dyn Memory>> {
        self.memory(index)
    }
}

impl<B: Buffer + ?Sized> Buffer for Arc<B> {
    fn n_memory(&self) -> usize {
        (**self).n_memory()
    }

    fn memory(&self, index: usize) -> Option<Arc<dyn Memory>> {
        (**self).memory(index)
    }

    fn tensor_count(&self) -> usize {
        (**self).tensor_count()
    }

    fn tensor_memory(&self, index: usize) -> Option<Arc<dyn Memory>> {
        (**self).tensor_memory(index)
    }
}
