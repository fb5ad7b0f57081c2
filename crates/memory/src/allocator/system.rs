//! System allocator implementation
//!
//! The heap tier. Wraps the C runtime's `malloc`/`free` pair, which frees from
//! a bare pointer; that is exactly the shape the tiered allocator's
//! `dealloc(p)` needs when it forwards an out-of-arena pointer.

use core::ptr::NonNull;

use super::{AllocError, AllocResult, Allocator};
use crate::utils::WORD_SIZE;

/// Wrapper for the platform's general-purpose heap
///
/// # Thread Safety
/// Thread safety is whatever the C runtime's `malloc` provides; every
/// mainstream libc is thread-safe.
///
/// # Alignment
/// `malloc` aligns to `max_align_t`, which covers [`WORD_SIZE`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAllocator;

impl SystemAllocator {
    /// Creates a new SystemAllocator
    #[inline]
    pub const fn new() -> Self {
        Self
    }
}

// SAFETY: malloc returns either null (mapped to an error) or a fresh,
// max_align_t-aligned block that free() accepts.
unsafe impl Allocator for SystemAllocator {
    #[inline]
    unsafe fn allocate(&self, size: usize) -> AllocResult<NonNull<u8>> {
        // malloc(0) may legally return null; ask for a word instead.
        let size = size.max(WORD_SIZE);

        // SAFETY: plain FFI call with no preconditions.
        let ptr = unsafe { libc::malloc(size) }.cast::<u8>();

        NonNull::new(ptr).ok_or_else(|| AllocError::allocation_failed(size, WORD_SIZE))
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        // SAFETY: caller guarantees `ptr` came from `allocate` above.
        unsafe { libc::free(ptr.as_ptr().cast()) };
    }
}
