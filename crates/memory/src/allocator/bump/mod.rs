//! Lock-free bump arena
//!
//! The arena tier. One contiguous buffer served by advancing a shared cursor
//! with a compare-and-swap retry loop: read the cursor, compute the end of the
//! requested slice, give up if that passes the end of the arena, otherwise try
//! to swing the cursor from the observed value to the new end. A failed swap
//! means another thread won the round; the loser re-reads and retries.
//!
//! ## Invariants
//!
//! - `start_addr <= cursor <= end_addr` at all times
//! - The cursor only moves forward
//! - Granted ranges never overlap (a range is owned once its CAS succeeds)
//! - A request that does not fit leaves the cursor untouched
//! - Individual deallocation is a no-op; memory returns to the system only
//!   when the whole arena is dropped

use core::alloc::Layout;
use core::ptr::NonNull;

mod cursor;

use cursor::AtomicCursor;

use crate::allocator::{AllocError, AllocResult, Allocator};
use crate::utils::{Backoff, round_to_word};

/// Alignment of the arena buffer itself.
///
/// Grants are word multiples from this base, so every pointer the arena hands
/// out is word-aligned.
pub const ARENA_ALIGN: usize = 16;

/// Append-only, lock-free bump arena
pub struct BumpArena {
    memory: NonNull<u8>,
    layout: Layout,
    start_addr: usize,
    end_addr: usize,
    cursor: AtomicCursor,
}

impl BumpArena {
    /// Creates an arena of `capacity` bytes
    pub fn new(capacity: usize) -> AllocResult<Self> {
        if capacity == 0 {
            return Err(AllocError::invalid_layout("arena capacity must be non-zero"));
        }

        let layout = Layout::from_size_align(capacity, ARENA_ALIGN)
            .map_err(|_| AllocError::size_overflow("arena layout"))?;

        // SAFETY: layout has non-zero size (checked above).
        let raw = unsafe { std::alloc::alloc(layout) };
        let memory =
            NonNull::new(raw).ok_or_else(|| AllocError::allocation_failed(capacity, ARENA_ALIGN))?;

        let start_addr = memory.as_ptr() as usize;
        let end_addr = start_addr + capacity;

        Ok(Self {
            memory,
            layout,
            start_addr,
            end_addr,
            cursor: AtomicCursor::new(start_addr),
        })
    }

    /// Total capacity
    #[inline]
    pub fn capacity(&self) -> usize {
        self.end_addr - self.start_addr
    }

    /// Bytes reserved so far
    #[inline]
    pub fn used(&self) -> usize {
        self.cursor.load() - self.start_addr
    }

    /// Bytes still available
    #[inline]
    pub fn available(&self) -> usize {
        self.end_addr - self.cursor.load()
    }

    /// Address of the first arena byte
    #[inline]
    pub fn start_addr(&self) -> usize {
        self.start_addr
    }

    /// One past the last arena byte
    #[inline]
    pub fn end_addr(&self) -> usize {
        self.end_addr
    }

    /// Current cursor address
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor.load()
    }

    /// `true` iff `addr` lies in `[start_addr, end_addr)`
    #[inline]
    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.start_addr && addr < self.end_addr
    }

    /// Reserves `size` bytes (rounded up to a word multiple).
    ///
    /// Lock-free: every failed CAS means some other thread's reservation
    /// succeeded. Returns `None` when the rounded request does not fit in
    /// the remaining space; nothing is reserved in that case.
    pub fn try_bump(&self, size: usize) -> Option<NonNull<u8>> {
        let size = round_to_word(size)?;
        let mut backoff = Backoff::new();

        loop {
            let current = self.cursor.load();
            let candidate = current.checked_add(size)?;

            if candidate > self.end_addr {
                return None;
            }

            if self.cursor.try_advance(current, candidate).is_ok() {
                let offset = current - self.start_addr;
                // SAFETY: offset + size <= capacity (checked above), so the
                // pointer stays inside the buffer we own; the successful CAS
                // makes [current, candidate) exclusively ours.
                let ptr = unsafe { self.memory.as_ptr().add(offset) };
                return NonNull::new(ptr);
            }

            backoff.spin();
        }
    }
}

impl Drop for BumpArena {
    fn drop(&mut self) {
        // SAFETY: `memory` was allocated in `new` with exactly `layout`.
        unsafe { std::alloc::dealloc(self.memory.as_ptr(), self.layout) };
    }
}

impl core::fmt::Debug for BumpArena {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BumpArena")
            .field("start_addr", &format_args!("{:#x}", self.start_addr))
            .field("capacity", &self.capacity())
            .field("used", &self.used())
            .finish()
    }
}

// SAFETY: BumpArena is Send because:
// - It exclusively owns its buffer (allocated in `new`, freed in `drop`)
// - The cursor is an atomic
unsafe impl Send for BumpArena {}

// SAFETY: BumpArena is Sync because:
// - The only shared mutable state is the cursor, updated by CAS
// - A successful CAS hands the winner an exclusive, non-overlapping range
// - AcqRel ordering publishes each cursor move to the next reader
unsafe impl Sync for BumpArena {}

// SAFETY: BumpArena implements Allocator via bump pointer allocation.
// - allocate() reserves exclusive word-aligned ranges via CAS
// - deallocate() is intentionally a no-op (bump memory is never reclaimed
//   individually)
unsafe impl Allocator for BumpArena {
    unsafe fn allocate(&self, size: usize) -> AllocResult<NonNull<u8>> {
        self.try_bump(size)
            .ok_or_else(|| AllocError::arena_exhausted("bump", size, self.available()))
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>) {}
}
