//! # strata-memory
//!
//! A tiered allocator for latency-sensitive code: one context object that
//! serves each request from a lock-free bump arena, a set of power-of-two
//! fixed-size pools, or the system heap, as the caller asks, and falls back to
//! the heap when the requested tier is exhausted.
//!
//! ## Quick Start
//!
//! ```rust
//! use strata_memory::prelude::*;
//!
//! # fn main() -> MemoryResult<()> {
//! let config = TieredConfig::new()
//!     .with_arena_size(4096)
//!     .with_class_block_counts([16, 16, 8]);
//! let alloc = TieredAllocator::new(config)?;
//!
//! // SAFETY: single-threaded, so the pooled tier needs no extra lock.
//! unsafe {
//!     let scratch = alloc.allocate(24, Tier::Arena)?;
//!     let node = alloc.allocate(12, Tier::Pooled)?;
//!     assert!(alloc.contains(scratch) && alloc.contains(node));
//!
//!     alloc.deallocate(node);
//!     alloc.deallocate(scratch); // bump memory: no-op
//!     alloc.release();
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `logging` (default): structured events through `tracing`; allocation
//!   trace records go to [`trace::TracingLogger`]
//!
//! ## Architecture
//!
//! - Standalone error handling via the [`error`] module
//! - Construction-time configuration in [`TieredConfig`](crate::core::TieredConfig)
//! - Tiers and the tiered front end under [`allocator`]
//! - Per-allocation trace records in [`trace`]

#![cfg_attr(docsrs, feature(doc_cfg))]
// Allocator internals are raw pointer code; every block carries a SAFETY note
#![allow(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::perf)]
#![warn(clippy::pedantic)]
#![warn(rust_2018_idioms)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
// Block counts are u32 by construction; index/usize casts are reviewed per-site
#![allow(clippy::cast_possible_truncation)]
// Accessors return Result/Option for API consistency even where infallible today
#![allow(clippy::unnecessary_wraps)]

// Error types
pub mod error;

// Core modules
pub mod allocator;
pub mod core;
pub mod trace;
pub mod utils;

// Re-export core types for convenience
pub use crate::allocator::{AllocError, AllocResult, Tier, TieredAllocator};
pub use crate::core::TieredConfig;
pub use crate::error::{MemoryError, MemoryResult};

// Public API exports
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::core::TieredConfig;

    pub use crate::error::{MemoryError, MemoryResult};

    pub use crate::allocator::{
        AllocError, AllocResult, Allocator, BlockPool, BumpArena, ClassStats, PoolSet,
        SystemAllocator, Tier, TieredAllocator, size_class,
    };

    pub use crate::trace::{AllocEvent, AllocLogger, NoopLogger};
    #[cfg(feature = "logging")]
    pub use crate::trace::TracingLogger;
}
