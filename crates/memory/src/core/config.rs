//! Configuration for the tiered allocator
//!
//! Everything here is fixed at construction: the arena size, the capacity of
//! each power-of-two size class, and whether allocation attempts are traced.

use crate::error::{MemoryError, MemoryResult};
use crate::utils::WORD_SIZE;

/// Upper bound on the number of size classes.
///
/// Class `i` serves blocks of `4 << i` bytes, so the largest class is 32 MiB.
pub const MAX_SIZE_CLASSES: usize = 24;

/// Tiered allocator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TieredConfig {
    /// Total bytes in the bump region, including the pool backing carved from it
    pub arena_size: usize,
    /// Block count per size class; entry `i` is the capacity of the `4 << i` class
    pub class_block_counts: Vec<u32>,
    /// Emit one trace record per allocation attempt
    pub debug: bool,
}

impl Default for TieredConfig {
    fn default() -> Self {
        Self {
            arena_size: 1024 * 1024,
            class_block_counts: vec![256, 256, 256, 128, 128, 64, 64, 32],
            debug: cfg!(debug_assertions),
        }
    }
}

impl TieredConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Production configuration - large arena, tracing off
    pub fn production() -> Self {
        Self {
            arena_size: 16 * 1024 * 1024,
            class_block_counts: vec![4096, 4096, 4096, 2048, 2048, 1024, 1024, 512, 256, 128],
            debug: false,
        }
    }

    /// Debug configuration - small arena so fallback paths are exercised early
    pub fn debug() -> Self {
        Self {
            arena_size: 64 * 1024,
            class_block_counts: vec![64, 64, 64, 32, 32, 16],
            debug: true,
        }
    }

    /// Embedded configuration - a few small classes in a tight arena
    pub fn embedded() -> Self {
        Self {
            arena_size: 16 * 1024,
            class_block_counts: vec![64, 64, 32, 16],
            debug: false,
        }
    }

    /// Set the arena size in bytes
    pub fn with_arena_size(mut self, arena_size: usize) -> Self {
        self.arena_size = arena_size;
        self
    }

    /// Set the per-class block counts
    pub fn with_class_block_counts(mut self, counts: impl Into<Vec<u32>>) -> Self {
        self.class_block_counts = counts.into();
        self
    }

    /// Enable or disable allocation tracing
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Number of configured size classes
    pub fn class_count(&self) -> usize {
        self.class_block_counts.len()
    }

    /// Arena bytes consumed by the pool backing at initialization.
    ///
    /// Returns `None` on overflow.
    pub fn pool_backing_bytes(&self) -> Option<usize> {
        self.class_block_counts
            .iter()
            .enumerate()
            .try_fold(0usize, |total, (class, &count)| {
                let block_size = 1usize.checked_shl(class as u32)?.checked_mul(WORD_SIZE)?;
                total.checked_add(block_size.checked_mul(count as usize)?)
            })
    }

    /// Validate the configuration
    pub fn validate(&self) -> MemoryResult<()> {
        if self.arena_size == 0 {
            return Err(MemoryError::invalid_config("arena_size must be non-zero"));
        }
        if self.class_block_counts.len() > MAX_SIZE_CLASSES {
            return Err(MemoryError::invalid_config(&format!(
                "{} size classes requested, at most {MAX_SIZE_CLASSES} supported",
                self.class_block_counts.len()
            )));
        }
        if self.class_block_counts.contains(&u32::MAX) {
            return Err(MemoryError::invalid_config(
                "class block count must be below u32::MAX",
            ));
        }

        let backing = self
            .pool_backing_bytes()
            .ok_or_else(|| MemoryError::size_overflow("pool backing size"))?;
        if backing > self.arena_size {
            return Err(MemoryError::arena_exhausted(
                "tiered",
                backing,
                self.arena_size,
            ));
        }

        Ok(())
    }
}
