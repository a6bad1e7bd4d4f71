//! Heap configuration.
//!
//! The defaults reproduce the classic setup of a 640000 byte arena whose
//! inventories hold up to 1024 chunks each. Values can also be read from a
//! TOML file:
//!
//! ```toml
//! arena_capacity = 65536
//! inventory_capacity = 256
//! ```

use std::{fs, path::Path};

use serde::Deserialize;

use crate::error::{HeapError, HeapResult};

/// Default arena size in bytes.
pub const DEFAULT_ARENA_CAPACITY: usize = 640_000;

/// Default maximum number of chunks per inventory.
pub const DEFAULT_INVENTORY_CAPACITY: usize = 1024;

/// Sizes of a [`crate::HeapManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeapConfig {
    /// Bytes in the arena. Fixed for the lifetime of the heap.
    pub arena_capacity: usize,
    /// Maximum number of chunks each inventory (allocated, free) can hold.
    pub inventory_capacity: usize,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            arena_capacity: DEFAULT_ARENA_CAPACITY,
            inventory_capacity: DEFAULT_INVENTORY_CAPACITY,
        }
    }
}

impl HeapConfig {
    /// Default configuration with a different arena size.
    pub fn with_arena_capacity(arena_capacity: usize) -> Self {
        Self { arena_capacity, ..Self::default() }
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> HeapResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> HeapResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)
            .map_err(|source| HeapError::ConfigRead { path: path.to_path_buf(), source })?;

        Self::from_toml_str(&source)
    }

    /// Rejects sizes that cannot make a working heap.
    pub fn validate(&self) -> HeapResult<()> {
        if self.arena_capacity == 0 {
            return Err(HeapError::InvalidConfig("arena_capacity must be greater than 0".into()));
        }

        if self.inventory_capacity == 0 {
            return Err(HeapError::InvalidConfig(
                "inventory_capacity must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}
