//! Allocator implementations
//!
//! - [`BumpArena`]: lock-free append-only region
//! - [`BlockPool`] / [`PoolSet`]: fixed-size blocks in power-of-two classes
//! - [`SystemAllocator`]: the C runtime heap
//! - [`TieredAllocator`]: all three behind one call, with heap fallback

pub mod block_pool;
pub mod bump;
pub mod pool_set;
pub mod system;
pub mod tiered;
pub mod traits;

pub use crate::error::{AllocError, AllocResult};

pub use block_pool::{BlockPool, NIL};
pub use bump::{ARENA_ALIGN, BumpArena};
pub use pool_set::{ClassStats, PoolSet, class_block_size, size_class};
pub use system::SystemAllocator;
pub use tiered::{Tier, TieredAllocator};
pub use traits::Allocator;
