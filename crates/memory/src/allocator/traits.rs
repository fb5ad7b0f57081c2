//! Allocator traits
//!
//! `Allocator` is the seam between a block pool and whatever hands it a
//! buffer. The bump arena implements it (so class buffers are carved out of
//! the arena at bootstrap) and so does the system heap (used directly by the
//! heap tier, and by standalone pools in tests).
//!
//! Unlike `core::alloc`, deallocation carries no layout: the tiered
//! allocator's `dealloc(p)` only has an address to route, so every source
//! must be able to free from the pointer alone.
//!
//! # Safety
//!
//! Implementors promise that:
//! - Returned pointers are non-null, aligned to at least [`WORD_SIZE`], and
//!   valid for reads and writes of the requested size
//! - Live allocations never overlap
//! - `deallocate` accepts any pointer previously returned by `allocate` on
//!   the same instance
//!
//! [`WORD_SIZE`]: crate::utils::WORD_SIZE

use core::ptr::NonNull;

use super::AllocResult;

/// Source of raw, word-aligned memory
pub unsafe trait Allocator {
    /// Allocates `size` bytes
    ///
    /// # Safety
    /// - Memory content is uninitialized and must be initialized before use
    /// - The returned pointer must only be released through this allocator
    unsafe fn allocate(&self, size: usize) -> AllocResult<NonNull<u8>>;

    /// Releases memory obtained from [`Allocator::allocate`]
    ///
    /// # Safety
    /// - `ptr` must have been allocated by this allocator and not yet released
    /// - After this call, `ptr` becomes invalid and must not be used
    unsafe fn deallocate(&self, ptr: NonNull<u8>);
}
