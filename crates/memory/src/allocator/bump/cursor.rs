//! Shared bump cursor
//!
//! A single word holding the address of the first unreserved arena byte. It
//! only ever moves forward, and only through a successful compare-and-swap.

use core::sync::atomic::{AtomicUsize, Ordering};

/// Atomic cursor for multi-threaded access
#[derive(Debug)]
pub(super) struct AtomicCursor(AtomicUsize);

impl AtomicCursor {
    pub(super) const fn new(val: usize) -> Self {
        Self(AtomicUsize::new(val))
    }

    #[inline]
    pub(super) fn load(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    /// Moves the cursor from `observed` to `candidate` iff no other thread
    /// moved it in between. May fail spuriously; callers retry.
    #[inline]
    pub(super) fn try_advance(&self, observed: usize, candidate: usize) -> Result<usize, usize> {
        debug_assert!(candidate >= observed, "bump cursor must not move backwards");
        self.0
            .compare_exchange_weak(observed, candidate, Ordering::AcqRel, Ordering::Acquire)
    }
}
