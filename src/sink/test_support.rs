//! Buffers whose memories count maps and unmaps.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;

use crate::core::{EdgeBuffer, MapError, MappedMemory, Memory};

/// Memory that counts maps and unmaps, and can refuse to map.
#[derive(Debug)]
pub(crate) struct TrackedMemory {
    data: Bytes,
    readable: bool,
    maps: Arc<AtomicUsize>,
    unmaps: Arc<AtomicUsize>,
}

impl Memory for TrackedMemory {
    fn size(&self) -> usize {
        self.data.len()
    }

    fn map_readable(&self) -> Result<MappedMemory, MapError> {
        if !self.readable {
            return Err(MapError::NotReadable);
        }
        self.maps.fetch_add(1, Ordering::SeqCst);
        let unmaps = Arc::clone(&self.unmaps);
        Ok(MappedMemory::with_unmap(self.data.clone(), move || {
            unmaps.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

/// Map and unmap counts shared by every memory of a tracked buffer.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    maps: Arc<AtomicUsize>,
    unmaps: Arc<AtomicUsize>,
}

impl Counters {
    pub(crate) fn maps(&self) -> usize {
        self.maps.load(Ordering::SeqCst)
    }

    pub(crate) fn unmaps(&self) -> usize {
        self.unmaps.load(Ordering::SeqCst)
    }
}

/// One tracked memory per chunk; the memory at `unreadable` refuses to map.
pub(crate) fn tracked_buffer(
    chunks: &[&'static [u8]],
    unreadable: Option<usize>,
) -> (EdgeBuffer, Counters) {
    let counters = Counters::default();
    let memories = chunks.iter().enumerate().map(|(index, &chunk)| {
        Arc::new(TrackedMemory {
            data: Bytes::from_static(chunk),
            readable: unreadable != Some(index),
            maps: Arc::clone(&counters.maps),
            unmaps: Arc::clone(&counters.unmaps),
        }) as Arc<dyn Memory>
    });
    (EdgeBuffer::from_memories(memories), counters)
}
