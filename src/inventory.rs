use std::slice;

use crate::{
    chunk::Chunk,
    error::{HeapError, HeapResult},
};

/// Address-ordered collection of [`Chunk`] with a fixed maximum size.
///
/// The heap keeps two of these, one for allocated chunks and one for free
/// chunks, plus a scratch one used while coalescing. Chunks are always kept
/// sorted by their start offset, which is what lets [`ChunkInventory::find`]
/// binary search and lets the coalescer merge neighbours in a single pass:
///
/// ```text
///   index:    0          1            2
///          +-------+  +-------+  +----------+
///          | 0, 4  |  | 4, 4  |  | 12, 988  |
///          +-------+  +-------+  +----------+
///   start:    0    <     4     <     12
/// ```
///
/// Storage is reserved up front for `capacity` chunks and never grows, so
/// running out of slots is reported as [`HeapError::CapacityExceeded`]
/// instead of reallocating. Insertions and removals shift the tail of the
/// storage which is O(n), fine for the small bounded sizes this is meant for.
#[derive(Debug, Clone)]
pub struct ChunkInventory {
    chunks: Vec<Chunk>,
    capacity: usize,
}

impl ChunkInventory {
    /// Creates an empty inventory that can hold up to `capacity` chunks.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { chunks: Vec::with_capacity(capacity), capacity }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.chunks.len() >= self.capacity
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    #[inline]
    pub fn last(&self) -> Option<&Chunk> {
        self.chunks.last()
    }

    pub fn iter(&self) -> slice::Iter<'_, Chunk> {
        self.chunks.iter()
    }

    /// Forgets every chunk, keeping the reserved storage.
    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    /// Sum of the sizes of all chunks.
    pub fn total_bytes(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.size).sum()
    }

    /// Size of the biggest chunk, or 0 when empty.
    pub fn largest(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.size).max().unwrap_or(0)
    }

    /// Inserts the chunk `{start, size}` at its sorted position.
    ///
    /// The new chunk is checked against its immediate neighbours; since the
    /// inventory is sorted and disjoint, those are the only chunks it could
    /// overlap. Zero sized chunks are rejected. On any error the inventory
    /// is left as it was.
    pub fn insert(&mut self, start: usize, size: usize) -> HeapResult<()> {
        if size == 0 {
            return Err(HeapError::EmptyChunk { start });
        }

        if self.is_full() {
            return Err(HeapError::CapacityExceeded { capacity: self.capacity });
        }

        let chunk = Chunk::new(start, size);

        let index = match self.chunks.binary_search_by_key(&start, |c| c.start) {
            Ok(existing) => return Err(overlap(chunk, self.chunks[existing])),
            Err(index) => index,
        };

        if let Some(prev) = index.checked_sub(1).map(|i| self.chunks[i]) {
            if prev.overlaps(&chunk) {
                return Err(overlap(chunk, prev));
            }
        }

        if let Some(&next) = self.chunks.get(index) {
            if next.overlaps(&chunk) {
                return Err(overlap(chunk, next));
            }
        }

        self.chunks.insert(index, chunk);

        Ok(())
    }

    /// Appends a chunk known to start after every stored chunk.
    ///
    /// Used by the coalescer, which walks an already sorted inventory.
    pub(crate) fn push_sorted(&mut self, chunk: Chunk) -> HeapResult<()> {
        debug_assert!(self.last().is_none_or(|last| last.end() <= chunk.start));

        if chunk.size == 0 {
            return Err(HeapError::EmptyChunk { start: chunk.start });
        }

        if self.is_full() {
            return Err(HeapError::CapacityExceeded { capacity: self.capacity });
        }

        self.chunks.push(chunk);

        Ok(())
    }

    /// Mutable access to the last chunk, used to grow it in place when
    /// coalescing. Growing must not make it reach past its old successor,
    /// which is trivially true for the last one.
    pub(crate) fn last_mut(&mut self) -> Option<&mut Chunk> {
        self.chunks.last_mut()
    }

    /// Returns the index of the chunk starting exactly at `address`.
    pub fn find(&self, address: usize) -> Option<usize> {
        self.chunks.binary_search_by_key(&address, |c| c.start).ok()
    }

    /// Removes and returns the chunk at `index`, keeping the order of the
    /// rest.
    pub fn remove(&mut self, index: usize) -> HeapResult<Chunk> {
        if index >= self.chunks.len() {
            return Err(HeapError::IndexOutOfRange { index, len: self.chunks.len() });
        }

        Ok(self.chunks.remove(index))
    }

    /// Moves the chunk at `index` into `target`, at its sorted position
    /// there. On error neither inventory is modified.
    pub fn move_into(&mut self, target: &mut ChunkInventory, index: usize) -> HeapResult<Chunk> {
        let chunk = *self
            .chunks
            .get(index)
            .ok_or(HeapError::IndexOutOfRange { index, len: self.chunks.len() })?;

        target.insert(chunk.start, chunk.size)?;

        Ok(self.chunks.remove(index))
    }

    /// `(start, size)` of every chunk in address order.
    pub fn dump(&self) -> Vec<(usize, usize)> {
        self.chunks.iter().copied().map(Into::into).collect()
    }
}

fn overlap(chunk: Chunk, existing: Chunk) -> HeapError {
    HeapError::OverlapDetected {
        start: chunk.start,
        size: chunk.size,
        existing_start: existing.start,
        existing_size: existing.size,
    }
}

impl<'a> IntoIterator for &'a ChunkInventory {
    type Item = &'a Chunk;
    type IntoIter = slice::Iter<'a, Chunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_inventory_is_empty() {
        let inventory = ChunkInventory::with_capacity(4);

        assert_eq!(inventory.len(), 0);
        assert!(inventory.is_empty());
        assert!(inventory.iter().next().is_none());
        assert_eq!(inventory.largest(), 0);
    }

    #[test]
    fn insert_keeps_address_order() {
        let mut inventory = ChunkInventory::with_capacity(8);

        inventory.insert(40, 8).unwrap();
        inventory.insert(0, 4).unwrap();
        inventory.insert(20, 2).unwrap();
        inventory.insert(4, 1).unwrap();

        assert_eq!(inventory.dump(), vec![(0, 4), (4, 1), (20, 2), (40, 8)]);
        assert_eq!(inventory.total_bytes(), 15);
        assert_eq!(inventory.largest(), 8);
    }

    #[test]
    fn insert_past_capacity_fails() {
        let mut inventory = ChunkInventory::with_capacity(2);

        inventory.insert(0, 1).unwrap();
        inventory.insert(1, 1).unwrap();

        assert!(matches!(
            inventory.insert(2, 1),
            Err(HeapError::CapacityExceeded { capacity: 2 })
        ));
        assert_eq!(inventory.len(), 2);
    }

    #[test]
    fn insert_rejects_zero_size() {
        let mut inventory = ChunkInventory::with_capacity(4);
        inventory.insert(0, 8).unwrap();

        let err = inventory.insert(8, 0).unwrap_err();

        assert!(matches!(err, HeapError::EmptyChunk { start: 8 }));
        assert!(err.is_fatal());
        assert_eq!(inventory.dump(), vec![(0, 8)]);
    }

    #[test]
    fn insert_rejects_overlap() {
        let mut inventory = ChunkInventory::with_capacity(8);

        inventory.insert(10, 10).unwrap();
        inventory.insert(30, 10).unwrap();

        // Same start.
        assert!(matches!(
            inventory.insert(10, 1),
            Err(HeapError::OverlapDetected { existing_start: 10, .. })
        ));
        // Runs into the next chunk.
        assert!(matches!(
            inventory.insert(5, 6),
            Err(HeapError::OverlapDetected { existing_start: 10, .. })
        ));
        // Starts inside the previous chunk.
        assert!(matches!(
            inventory.insert(39, 5),
            Err(HeapError::OverlapDetected { existing_start: 30, .. })
        ));

        inventory.insert(20, 10).unwrap();
        assert_eq!(inventory.dump(), vec![(10, 10), (20, 10), (30, 10)]);
    }

    #[test]
    fn find_by_start() {
        let mut inventory = ChunkInventory::with_capacity(8);

        for start in [0, 8, 16, 24, 32] {
            inventory.insert(start, 8).unwrap();
        }

        assert_eq!(inventory.find(0), Some(0));
        assert_eq!(inventory.find(24), Some(3));
        assert_eq!(inventory.find(32), Some(4));
        // Inside a chunk but not its start.
        assert_eq!(inventory.find(9), None);
        assert_eq!(inventory.find(100), None);
    }

    #[test]
    fn find_in_empty_inventory() {
        let inventory = ChunkInventory::with_capacity(1);

        assert_eq!(inventory.find(0), None);
    }

    #[test]
    fn remove_shifts_later_chunks() {
        let mut inventory = ChunkInventory::with_capacity(4);

        inventory.insert(0, 4).unwrap();
        inventory.insert(4, 4).unwrap();
        inventory.insert(8, 4).unwrap();

        assert_eq!(inventory.remove(1).unwrap(), Chunk::new(4, 4));
        assert_eq!(inventory.dump(), vec![(0, 4), (8, 4)]);
        assert_eq!(inventory.find(8), Some(1));
    }

    #[test]
    fn move_between_inventories() {
        let mut from = ChunkInventory::with_capacity(4);
        let mut to = ChunkInventory::with_capacity(1);
        from.insert(0, 4).unwrap();
        from.insert(4, 4).unwrap();

        assert_eq!(from.move_into(&mut to, 1).unwrap(), Chunk::new(4, 4));
        assert_eq!(from.dump(), vec![(0, 4)]);
        assert_eq!(to.dump(), vec![(4, 4)]);

        // Target full: nothing moves.
        assert!(matches!(
            from.move_into(&mut to, 0),
            Err(HeapError::CapacityExceeded { capacity: 1 })
        ));
        assert_eq!(from.dump(), vec![(0, 4)]);

        assert!(matches!(
            from.move_into(&mut to, 5),
            Err(HeapError::IndexOutOfRange { index: 5, len: 1 })
        ));
    }

    #[test]
    fn remove_out_of_range_fails() {
        let mut inventory = ChunkInventory::with_capacity(4);
        inventory.insert(0, 4).unwrap();

        assert!(matches!(
            inventory.remove(1),
            Err(HeapError::IndexOutOfRange { index: 1, len: 1 })
        ));
        assert_eq!(inventory.len(), 1);
    }
}
