use std::{fmt, mem};

use tracing::{debug, error, trace, warn};

use crate::{
    chunk::Chunk,
    coalesce,
    config::HeapConfig,
    diagnostics,
    error::{HeapError, HeapResult},
    inventory::ChunkInventory,
    kernel::Arena,
};

/// Identifies a live allocation: the offset of its first byte in the arena.
///
/// Handles are plain values. Keeping one after releasing it is harmless but
/// passing it to [`HeapManager::release`] again is reported as
/// [`HeapError::InvalidHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(usize);

impl Handle {
    /// Builds a handle from a raw arena offset.
    pub const fn from_offset(offset: usize) -> Self {
        Self(offset)
    }

    /// Offset of the allocation in the arena.
    pub const fn offset(self) -> usize {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Byte and chunk counters of a heap at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    pub capacity: usize,
    pub allocated_bytes: usize,
    pub free_bytes: usize,
    pub allocated_chunks: usize,
    pub free_chunks: usize,
    pub largest_free: usize,
}

/// First-fit allocator over a single fixed-size arena.
///
/// Every byte of the arena belongs to exactly one chunk, and every chunk is
/// either in the allocated inventory or in the free one:
///
/// ```text
///            0        4        8       12                          capacity
///   arena    +--------+--------+--------+-----------------------------+
///            | alloc  |  free  | alloc  |            free             |
///            +--------+--------+--------+-----------------------------+
///
///   allocated: [0, +4)           [8, +4)
///   free:               [4, +4)          [12, +capacity-12)
/// ```
///
/// Releasing only moves the chunk to the free inventory. Touching free
/// chunks are fused lazily, at the start of the next allocation, so that
/// cost is paid only when contiguous space is actually needed.
///
/// The heap is not thread safe, see [`crate::SharedHeap`] for a locked
/// wrapper.
pub struct HeapManager {
    arena: Arena,
    allocated: ChunkInventory,
    free: ChunkInventory,
    /// Target of the coalescing pass, swapped with `free` afterwards. Its
    /// content is meaningless between calls.
    scratch: ChunkInventory,
}

impl HeapManager {
    /// Maps the arena and seeds the free inventory with a single chunk
    /// spanning all of it.
    pub fn new(config: HeapConfig) -> HeapResult<Self> {
        config.validate()?;

        let arena = Arena::new(config.arena_capacity)?;

        let mut free = ChunkInventory::with_capacity(config.inventory_capacity);
        free.insert(0, config.arena_capacity)?;

        debug!(
            arena_capacity = config.arena_capacity,
            inventory_capacity = config.inventory_capacity,
            "heap initialized"
        );

        Ok(Self {
            arena,
            allocated: ChunkInventory::with_capacity(config.inventory_capacity),
            free,
            scratch: ChunkInventory::with_capacity(config.inventory_capacity),
        })
    }

    /// Heap of `arena_capacity` bytes with the default inventory capacity.
    pub fn with_capacity(arena_capacity: usize) -> HeapResult<Self> {
        Self::new(HeapConfig::with_arena_capacity(arena_capacity))
    }

    /// Size of the arena in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.arena.len()
    }

    #[inline]
    pub fn allocated_inventory(&self) -> &ChunkInventory {
        &self.allocated
    }

    #[inline]
    pub fn free_inventory(&self) -> &ChunkInventory {
        &self.free
    }

    /// Reserves `size` bytes and returns the handle of the new allocation.
    ///
    /// A request of 0 bytes returns `Ok(None)` without touching anything.
    /// Otherwise the free inventory is coalesced and the first free chunk
    /// big enough is carved: its head becomes the allocation and the tail,
    /// if any, goes back to the free inventory.
    ///
    /// Fails with [`HeapError::OutOfMemory`] when no free chunk fits, which
    /// the caller may recover from by releasing other allocations.
    pub fn allocate(&mut self, size: usize) -> HeapResult<Option<Handle>> {
        if size == 0 {
            trace!("zero sized allocation");
            return Ok(None);
        }

        self.coalesce()?;

        let Some(index) = self.free.iter().position(|chunk| chunk.size >= size) else {
            let largest_free = self.free.largest();
            warn!(size, largest_free, "out of memory");
            return Err(HeapError::OutOfMemory { requested: size, largest_free });
        };

        // Checked up front so a failure cannot leave the carved bytes in
        // neither inventory.
        if self.allocated.is_full() {
            return Err(HeapError::CapacityExceeded { capacity: self.allocated.capacity() });
        }

        let chunk = self.free.remove(index)?;
        self.allocated.insert(chunk.start, size)?;

        let tail = chunk.size - size;
        if tail > 0 {
            // The removal above left a slot for it.
            self.free.insert(chunk.start + size, tail)?;
        }

        debug!(size, offset = chunk.start, "allocated");
        self.debug_verify();

        Ok(Some(Handle(chunk.start)))
    }

    /// Gives the allocation back to the free inventory.
    ///
    /// `None` is accepted and ignored. A handle that is not the start of a
    /// live allocation fails with [`HeapError::InvalidHandle`].
    pub fn release(&mut self, handle: impl Into<Option<Handle>>) -> HeapResult<()> {
        let Some(handle) = handle.into() else {
            return Ok(());
        };

        let Some(index) = self.allocated.find(handle.offset()) else {
            error!(offset = handle.offset(), "double free or invalid handle");
            return Err(HeapError::InvalidHandle(handle.offset()));
        };

        let chunk = self.allocated.move_into(&mut self.free, index)?;

        debug!(size = chunk.size, offset = chunk.start, "released");
        self.debug_verify();

        Ok(())
    }

    /// Reserved for a future reclamation pass. Does nothing.
    pub fn collect(&mut self) {
        trace!("collect requested, nothing to do");
    }

    /// `(offset, size)` of every allocation in address order.
    pub fn dump_allocated(&self) -> Vec<(usize, usize)> {
        self.allocated.dump()
    }

    /// `(offset, size)` of every free chunk in address order. Touching
    /// chunks released since the last allocation are still listed apart.
    pub fn dump_free(&self) -> Vec<(usize, usize)> {
        self.free.dump()
    }

    /// Contents of the allocation identified by `handle`.
    pub fn bytes(&self, handle: Handle) -> HeapResult<&[u8]> {
        let chunk = self.live_chunk(handle)?;

        Ok(self.arena.slice(chunk.start, chunk.size))
    }

    /// Mutable contents of the allocation identified by `handle`.
    pub fn bytes_mut(&mut self, handle: Handle) -> HeapResult<&mut [u8]> {
        let chunk = self.live_chunk(handle)?;

        Ok(self.arena.slice_mut(chunk.start, chunk.size))
    }

    pub fn stats(&self) -> HeapStats {
        HeapStats {
            capacity: self.capacity(),
            allocated_bytes: self.allocated.total_bytes(),
            free_bytes: self.free.total_bytes(),
            allocated_chunks: self.allocated.len(),
            free_chunks: self.free.len(),
            largest_free: self.free.largest(),
        }
    }

    fn live_chunk(&self, handle: Handle) -> HeapResult<Chunk> {
        self.allocated
            .find(handle.offset())
            .and_then(|index| self.allocated.get(index).copied())
            .ok_or(HeapError::InvalidHandle(handle.offset()))
    }

    /// Fuses touching free chunks. The merged list is built in `scratch` and
    /// the two inventories are swapped.
    fn coalesce(&mut self) -> HeapResult<()> {
        coalesce::merge(&self.free, &mut self.scratch)?;
        mem::swap(&mut self.free, &mut self.scratch);
        Ok(())
    }

    #[inline]
    fn debug_verify(&self) {
        if cfg!(debug_assertions) {
            if let Err(violation) = diagnostics::verify(self) {
                panic!("heap invariant broken: {violation}");
            }
        }
    }
}

impl fmt::Debug for HeapManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapManager")
            .field("capacity", &self.capacity())
            .field("allocated", &self.allocated.dump())
            .field("free", &self.free.dump())
            .finish()
    }
}
