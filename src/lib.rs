//! # chunkheap
//!
//! A fixed-capacity heap carved out of a single arena that is mapped from the
//! operating system once and never grows. Allocations are tracked in two
//! address-ordered inventories, one for allocated chunks and one for free
//! chunks:
//!
//! ```text
//!                               Arena
//!   0                                                               capacity
//!   +--------+--------+--------+------------------------------------------+
//!   |   A    |  free  |   A    |                  free                    |
//!   +--------+--------+--------+------------------------------------------+
//!
//!   allocated:  [0, +4)  [8, +4)
//!   free:       [4, +4)  [12, +capacity-12)
//! ```
//!
//! * `allocate(size)` first fuses touching free chunks, then takes the first
//!   free chunk big enough (lowest address wins) and splits off the tail.
//! * `release(handle)` binary searches the allocated inventory and moves the
//!   chunk back to the free one. Fusing is left for the next allocation.
//!
//! Chunk starts are offsets into the arena, so the bookkeeping never deals
//! with raw pointers. The bytes of a live allocation are reached through
//! [`HeapManager::bytes`] and [`HeapManager::bytes_mut`].
//!
//! ```rust
//! use chunkheap::{HeapManager, HeapReport};
//!
//! let mut heap = HeapManager::with_capacity(640_000)?;
//!
//! let a = heap.allocate(4)?;
//! let b = heap.allocate(4)?;
//! let _c = heap.allocate(4)?;
//!
//! heap.release(a)?;
//! heap.release(b)?;
//!
//! // Reuses the 8 bytes freed above.
//! let d = heap.allocate(6)?;
//! assert_eq!(d.map(|d| d.offset()), Some(0));
//!
//! println!("{}", HeapReport(&heap));
//! # Ok::<(), chunkheap::HeapError>(())
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   chunkheap
//!   ├── chunk        - Chunk value type
//!   ├── inventory    - Sorted, bounded chunk inventory
//!   ├── coalesce     - Merge pass over touching chunks
//!   ├── heap         - HeapManager: allocate / release / collect
//!   ├── diagnostics  - Listings and invariant checks
//!   ├── sync         - SharedHeap, a locked HeapManager
//!   ├── config       - HeapConfig and TOML loading
//!   ├── error        - HeapError
//!   ├── kernel       - OS backed arena memory (internal)
//!   └── utils        - Alignment helper
//! ```
//!
//! ## Limitations
//!
//! - The arena never grows.
//! - No alignment beyond byte addressing.
//! - [`HeapManager`] is single threaded; share it through [`SharedHeap`].

mod chunk;
pub mod coalesce;
mod config;
pub mod diagnostics;
mod error;
mod heap;
mod inventory;
mod kernel;
mod sync;
pub mod utils;

pub use chunk::Chunk;
pub use config::{DEFAULT_ARENA_CAPACITY, DEFAULT_INVENTORY_CAPACITY, HeapConfig};
pub use diagnostics::{ChunkListing, HeapReport, InvariantViolation};
pub use error::{HeapError, HeapResult};
pub use heap::{Handle, HeapManager, HeapStats};
pub use inventory::ChunkInventory;
pub use sync::SharedHeap;
