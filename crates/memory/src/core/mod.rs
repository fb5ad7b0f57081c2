//! Core functionality for strata-memory
//!
//! - Allocator configuration
//! - Internal synchronization primitives

pub mod config;
pub(crate) mod sync_cell;

pub(crate) use sync_cell::SyncUnsafeCell;

pub use config::{MAX_SIZE_CLASSES, TieredConfig};
