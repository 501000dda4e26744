//! Heap-backed memory regions and buffers.
//!
//! All views are zero-copy: mapping or slicing only bumps the reference count
//! of the shared [`Bytes`] storage.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use bytes::Bytes;

use super::error::MapError;
use super::traits::{Buffer, Memory};

type UnmapHook = Box<dyn FnOnce() + Send>;

/// Read-only view of a mapped [`Memory`].
///
/// Dropping the view unmaps it. The unmap hook, if any, runs exactly once.
pub struct MappedMemory {
    data: Bytes,
    on_unmap: Option<UnmapHook>,
}

impl MappedMemory {
    /// Create a view with no unmap side effect.
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            on_unmap: None,
        }
    }

    /// Create a view that runs `on_unmap` when it is dropped.
    pub fn with_unmap<F>(data: Bytes, on_unmap: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            data,
            on_unmap: Some(Box::new(on_unmap)),
        }
    }

    /// The mapped bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Length of the mapped bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the view is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Narrow the view to `size` bytes starting at `offset`.
    ///
    /// The unmap hook moves to the narrowed view.
    pub fn slice(mut self, offset: usize, size: usize) -> Result<Self, MapError> {
        let available = self.data.len();
        let end = offset.checked_add(size).filter(|end| *end <= available);
        let Some(end) = end else {
            return Err(MapError::OutOfRange {
                offset,
                size,
                available,
            });
        };

        let data = std::mem::take(&mut self.data).slice(offset..end);
        Ok(Self {
            data,
            on_unmap: self.on_unmap.take(),
        })
    }
}

impl Deref for MappedMemory {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl AsRef<[u8]> for MappedMemory {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl Drop for MappedMemory {
    fn drop(&mut self) {
        if let Some(unmap) = self.on_unmap.take() {
            unmap();
        }
    }
}

impl fmt::Debug for MappedMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedMemory")
            .field("len", &self.data.len())
            .field("has_unmap_hook", &self.on_unmap.is_some())
            .finish()
    }
}

/// Memory region backed by shared heap storage.
#[derive(Debug, Clone, Default)]
pub struct HeapMemory {
    data: Bytes,
}

impl HeapMemory {
    /// Wrap existing storage.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Wrap a static byte slice.
    pub fn from_static(data: &'static [u8]) -> Self {
        Self {
            data: Bytes::from_static(data),
        }
    }
}

impl Memory for HeapMemory {
    fn size(&self) -> usize {
        self.data.len()
    }

    fn map_readable(&self) -> Result<MappedMemory, MapError> {
        Ok(MappedMemory::new(self.data.clone()))
    }
}

/// A view over a byte range of another memory region.
///
/// Used for tensor sub-segments packed inside a single allocation.
#[derive(Debug, Clone)]
pub struct SubMemory {
    parent: Arc<dyn Memory>,
    offset: usize,
    size: usize,
}

impl SubMemory {
    /// Create a view of `size` bytes at `offset` within `parent`.
    pub fn new(parent: Arc<dyn Memory>, offset: usize, size: usize) -> Result<Self, MapError> {
        let available = parent.size();
        if offset.checked_add(size).is_none_or(|end| end > available) {
            return Err(MapError::OutOfRange {
                offset,
                size,
                available,
            });
        }
        Ok(Self {
            parent,
            offset,
            size,
        })
    }
}

impl Memory for SubMemory {
    fn size(&self) -> usize {
        self.size
    }

    fn map_readable(&self) -> Result<MappedMemory, MapError> {
        self.parent.map_readable()?.slice(self.offset, self.size)
    }
}

/// General purpose buffer made of discrete memory regions.
///
/// A buffer may additionally declare a tensor layout; in that case the tensor
/// accessors return views into the native regions instead of the regions
/// themselves.
#[derive(Debug, Clone, Default)]
pub struct EdgeBuffer {
    memories: Vec<Arc<dyn Memory>>,
    tensors: Option<Vec<Arc<dyn Memory>>>,
}

impl EdgeBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer from existing memory regions.
    pub fn from_memories<I>(memories: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Memory>>,
    {
        Self {
            memories: memories.into_iter().collect(),
            tensors: None,
        }
    }

    /// Create a buffer with one heap region per chunk.
    pub fn from_chunks<I, T>(chunks: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Bytes>,
    {
        Self::from_memories(
            chunks
                .into_iter()
                .map(|chunk| Arc::new(HeapMemory::new(chunk)) as Arc<dyn Memory>),
        )
    }

    /// Create a tensor buffer whose tensors are packed back to back in one
    /// allocation.
    ///
    /// `sizes` gives each tensor's byte length in order. Trailing bytes not
    /// covered by `sizes` stay in the native region but belong to no tensor.
    pub fn with_packed_tensors(data: impl Into<Bytes>, sizes: &[usize]) -> Result<Self, MapError> {
        let parent: Arc<dyn Memory> = Arc::new(HeapMemory::new(data));
        let mut tensors = Vec::with_capacity(sizes.len());
        let mut offset = 0usize;
        for &size in sizes {
            let view = SubMemory::new(Arc::clone(&parent), offset, size)?;
            offset += size;
            tensors.push(Arc::new(view) as Arc<dyn Memory>);
        }
        Ok(Self {
            memories: vec![parent],
            tensors: Some(tensors),
        })
    }

    /// Append a memory region.
    pub fn append_memory(&mut self, memory: Arc<dyn Memory>) {
        self.memories.push(memory);
    }

    /// Total size of all native regions.
    pub fn size(&self) -> usize {
        self.memories.iter().map(|m| m.size()).sum()
    }

    /// Whether a tensor layout has been declared.
    pub fn has_tensor_layout(&self) -> bool {
        self.tensors.is_some()
    }
}

impl Buffer for EdgeBuffer {
    fn n_memory(&self) -> usize {
        self.memories.len()
    }

    fn memory(&self, index: usize) -> Option<Arc<dyn Memory>> {
        self.memories.get(index).cloned()
    }

    fn tensor_count(&self) -> usize {
        match &self.tensors {
            Some(tensors) => tensors.len(),
            None => self.memories.len(),
        }
    }

    fn tensor_memory(&self, index: usize) -> Option<Arc<dyn Memory>> {
        match &self.tensors {
            Some(tensors) => tensors.get(index).cloned(),
            None => self.memory(index),
        }
    }
}
