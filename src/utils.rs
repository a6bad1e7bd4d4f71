//! Helper functions that don't particularly belong to any concrete module.

/// It aligns `to_be_aligned` up to a multiple of `alignment`, which must be a
/// power of two. Returns `None` when the result does not fit in a `usize`.
///
/// Used to round the arena mapping to a multiple of the page size, since the
/// kernel hands out memory in whole pages.
pub fn align(to_be_aligned: usize, alignment: usize) -> Option<usize> {
    debug_assert!(alignment.is_power_of_two());

    to_be_aligned.checked_add(alignment - 1).map(|value| value & !(alignment - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_page_size() {
        // For testing purposes we are assuming the page size is 4096
        let alignments = vec![(1..4097, 4096), (4097..8193, 8192)];

        for (sizes, expected) in alignments {
            for size in sizes {
                assert_eq!(Some(expected), align(size, 4096))
            }
        }
    }

    #[test]
    fn aligned_values_stay() {
        assert_eq!(align(0, 4096), Some(0));
        assert_eq!(align(640_000, 16), Some(640_000));
    }

    #[test]
    fn align_overflow() {
        assert_eq!(align(usize::MAX, 4096), None);
        assert_eq!(align(usize::MAX - 4094, 4096), None);
        assert_eq!(align(usize::MAX - 4095, 4096), Some(usize::MAX - 4095));
    }
}
