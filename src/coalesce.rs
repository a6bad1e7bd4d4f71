use tracing::trace;

use crate::{error::HeapResult, inventory::ChunkInventory};

/// Rebuilds `source` into `target`, fusing chunks that touch each other.
///
/// `target` is cleared first. Each chunk of `source` is compared with the
/// last chunk written to `target`: if the last one ends exactly where the
/// current one starts, it absorbs it, otherwise the current chunk is copied
/// as is. Because the comparison is against what was already written, a run
/// of touching chunks collapses into one:
///
/// ```text
///   source:  [0, 4) [4, 8) [8, 10)   [16, 20)
///   target:  [0,           10)       [16, 20)
/// ```
///
/// `source` must already be sorted by address, which every
/// [`ChunkInventory`] is. The output never has more chunks than the input,
/// so a `target` with the same capacity as `source` cannot overflow.
pub fn merge(source: &ChunkInventory, target: &mut ChunkInventory) -> HeapResult<()> {
    target.clear();

    for chunk in source {
        if let Some(top) = target.last_mut().filter(|top| top.touches(chunk)) {
            top.size += chunk.size;
        } else {
            target.push_sorted(*chunk)?;
        }
    }

    trace!(before = source.len(), after = target.len(), "coalesced chunks");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inventory(chunks: &[(usize, usize)]) -> ChunkInventory {
        let mut inventory = ChunkInventory::with_capacity(16);
        for &(start, size) in chunks {
            inventory.insert(start, size).unwrap();
        }
        inventory
    }

    #[test]
    fn merges_runs_of_touching_chunks() {
        let source = inventory(&[(0, 4), (4, 4), (8, 2), (16, 4), (20, 1), (30, 2)]);
        let mut target = ChunkInventory::with_capacity(16);

        merge(&source, &mut target).unwrap();

        assert_eq!(target.dump(), vec![(0, 10), (16, 5), (30, 2)]);
    }

    #[test]
    fn leaves_separated_chunks_alone() {
        let source = inventory(&[(0, 4), (5, 4), (10, 4)]);
        let mut target = ChunkInventory::with_capacity(16);

        merge(&source, &mut target).unwrap();

        assert_eq!(target.dump(), source.dump());
    }

    #[test]
    fn target_is_reset() {
        let source = inventory(&[(0, 4)]);
        let mut target = inventory(&[(100, 1), (200, 1)]);

        merge(&source, &mut target).unwrap();

        assert_eq!(target.dump(), vec![(0, 4)]);
    }

    #[test]
    fn empty_source() {
        let source = ChunkInventory::with_capacity(4);
        let mut target = inventory(&[(0, 1)]);

        merge(&source, &mut target).unwrap();

        assert!(target.is_empty());
    }

    #[test]
    fn merging_twice_changes_nothing() {
        let source = inventory(&[(0, 1), (1, 1), (3, 1), (4, 4), (9, 3), (12, 1)]);
        let mut once = ChunkInventory::with_capacity(16);
        let mut twice = ChunkInventory::with_capacity(16);

        merge(&source, &mut once).unwrap();
        merge(&once, &mut twice).unwrap();

        assert_eq!(once.dump(), vec![(0, 2), (3, 5), (9, 4)]);
        assert_eq!(once.dump(), twice.dump());
    }

    #[test]
    fn full_source_fits_in_equal_target() {
        let source = inventory(&(0..16).map(|i| (i * 2, 1)).collect::<Vec<_>>());
        let mut target = ChunkInventory::with_capacity(16);

        merge(&source, &mut target).unwrap();

        assert_eq!(target.len(), 16);
    }
}
