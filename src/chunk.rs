/// A contiguous byte range of the arena.
///
/// `start` is an offset into the arena rather than a pointer, so chunks can
/// be copied around the inventories freely.
///
/// ```text
///   start                      start + size
///     |                             |
///     v                             v
/// ----+-----------------------------+----
///     |        size bytes           |
/// ----+-----------------------------+----
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chunk {
    /// Offset of the first byte of the chunk.
    pub start: usize,
    /// Size of the chunk in bytes. Never zero once stored in an inventory.
    pub size: usize,
}

impl Chunk {
    pub const fn new(start: usize, size: usize) -> Self {
        Self { start, size }
    }

    /// One past the last byte of the chunk.
    #[inline]
    pub const fn end(&self) -> usize {
        self.start + self.size
    }

    /// Tells whether `next` begins exactly where this chunk ends.
    #[inline]
    pub const fn touches(&self, next: &Chunk) -> bool {
        self.end() == next.start
    }

    /// Tells whether both chunks share at least one byte.
    #[inline]
    pub const fn overlaps(&self, other: &Chunk) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

impl From<Chunk> for (usize, usize) {
    fn from(chunk: Chunk) -> Self {
        (chunk.start, chunk.size)
    }
}
