//! Inspection helpers: printable listings of the inventories and a checker
//! for the invariants the heap must hold between calls.

use std::fmt;

use thiserror::Error;

use crate::{chunk::Chunk, heap::HeapManager, inventory::ChunkInventory};

/// Prints one line per chunk:
///
/// ```text
/// -> 0x0, size: 6
/// -> 0x8, size: 4
/// ```
pub struct ChunkListing<'a>(pub &'a ChunkInventory);

impl fmt::Display for ChunkListing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.0 {
            writeln!(f, "-> {:#x}, size: {}", chunk.start, chunk.size)?;
        }
        Ok(())
    }
}

/// Both inventories of a heap, allocated first.
pub struct HeapReport<'a>(pub &'a HeapManager);

impl fmt::Display for HeapReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "allocated chunks")?;
        write!(f, "{}", ChunkListing(self.0.allocated_inventory()))?;
        writeln!(f)?;
        writeln!(f, "freed chunks")?;
        write!(f, "{}", ChunkListing(self.0.free_inventory()))
    }
}

/// First broken invariant found by [`verify`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("{inventory} inventory not sorted at index {index}")]
    Unsorted { inventory: &'static str, index: usize },

    #[error("{inventory} inventory holds an empty chunk at {start:#x}")]
    EmptyChunk { inventory: &'static str, start: usize },

    #[error("bytes [{from:#x}, {to:#x}) belong to no chunk")]
    Gap { from: usize, to: usize },

    #[error("chunk at {start:#x} overlaps bytes up to {covered:#x}")]
    Overlap { start: usize, covered: usize },

    #[error("chunks end at {end:#x}, arena ends at {capacity:#x}")]
    Coverage { end: usize, capacity: usize },
}

/// Checks that both inventories are sorted and that, together, their chunks
/// tile the arena with no gaps and no overlaps.
pub fn verify(heap: &HeapManager) -> Result<(), InvariantViolation> {
    check_inventory("allocated", heap.allocated_inventory())?;
    check_inventory("free", heap.free_inventory())?;

    let mut chunks: Vec<Chunk> =
        heap.allocated_inventory().iter().chain(heap.free_inventory()).copied().collect();
    chunks.sort_unstable_by_key(|chunk| chunk.start);

    let mut covered = 0;
    for chunk in chunks {
        if chunk.start > covered {
            return Err(InvariantViolation::Gap { from: covered, to: chunk.start });
        }
        if chunk.start < covered {
            return Err(InvariantViolation::Overlap { start: chunk.start, covered });
        }
        covered = chunk.end();
    }

    if covered != heap.capacity() {
        return Err(InvariantViolation::Coverage { end: covered, capacity: heap.capacity() });
    }

    Ok(())
}

fn check_inventory(
    inventory: &'static str,
    chunks: &ChunkInventory,
) -> Result<(), InvariantViolation> {
    let mut prev: Option<&Chunk> = None;

    for (index, chunk) in chunks.iter().enumerate() {
        if chunk.size == 0 {
            return Err(InvariantViolation::EmptyChunk { inventory, start: chunk.start });
        }
        if prev.is_some_and(|prev| prev.start >= chunk.start) {
            return Err(InvariantViolation::Unsorted { inventory, index });
        }
        prev = Some(chunk);
    }

    Ok(())
}
