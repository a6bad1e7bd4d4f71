//! Errors reported by the heap and its inventories.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while building or driving a heap.
///
/// [`HeapError::OutOfMemory`] is the only condition a caller is expected to
/// recover from. The others signal misuse or a broken invariant; the heap
/// is left untouched when they are returned, so the caller decides whether
/// to abort.
#[derive(Error, Debug)]
pub enum HeapError {
    /// No free chunk is large enough for the request.
    #[error("out of memory: requested {requested} bytes, largest free chunk is {largest_free} bytes")]
    OutOfMemory {
        /// Bytes asked for.
        requested: usize,
        /// Size of the biggest free chunk after coalescing.
        largest_free: usize,
    },

    /// An inventory is already holding as many chunks as it can.
    #[error("chunk inventory full: capacity is {capacity} chunks")]
    CapacityExceeded {
        /// Maximum number of chunks of the inventory.
        capacity: usize,
    },

    /// Positional access past the end of an inventory.
    #[error("chunk index {index} out of range for inventory of {len} chunks")]
    IndexOutOfRange {
        /// Requested position.
        index: usize,
        /// Number of chunks stored.
        len: usize,
    },

    /// The handle is not the start of a live allocation (never allocated or
    /// already released).
    #[error("double free or invalid handle at offset {0:#x}")]
    InvalidHandle(usize),

    /// A chunk would have shared bytes with one already in the inventory.
    #[error(
        "chunk [{start:#x}, +{size}) overlaps existing chunk [{existing_start:#x}, +{existing_size})"
    )]
    OverlapDetected {
        /// Start of the rejected chunk.
        start: usize,
        /// Size of the rejected chunk.
        size: usize,
        /// Start of the chunk already stored.
        existing_start: usize,
        /// Size of the chunk already stored.
        existing_size: usize,
    },

    /// A chunk of zero bytes was offered to an inventory.
    #[error("empty chunk at offset {start:#x}")]
    EmptyChunk {
        /// Start of the rejected chunk.
        start: usize,
    },

    /// The operating system refused to map the arena.
    #[error("could not obtain {size} bytes of arena memory from the operating system")]
    ArenaUnavailable {
        /// Bytes requested from the OS.
        size: usize,
    },

    /// The configuration values cannot describe a usable heap.
    #[error("invalid heap configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    ConfigRead {
        /// File that was being read.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`crate::HeapConfig`].
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl HeapError {
    /// Tells whether the error denotes a violated contract rather than a
    /// runtime condition the caller can recover from.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HeapError::CapacityExceeded { .. }
                | HeapError::IndexOutOfRange { .. }
                | HeapError::InvalidHandle(_)
                | HeapError::OverlapDetected { .. }
                | HeapError::EmptyChunk { .. }
        )
    }
}

/// Result type for heap operations.
pub type HeapResult<T> = Result<T, HeapError>;
