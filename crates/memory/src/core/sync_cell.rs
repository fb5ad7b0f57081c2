//! Thread-safe interior mutability primitive for the pooled tier.
//!
//! The size-class pools are not internally synchronized. `SyncUnsafeCell` lets
//! the tiered allocator hold its `PoolSet` behind `&self` (so the lock-free bump
//! tier stays shareable across threads) while the pooled entry points carry
//! the serialization requirement in their `unsafe` contracts.

use core::cell::UnsafeCell;

/// A wrapper around `UnsafeCell<T>` that implements `Sync`.
///
/// # Safety
///
/// The caller must ensure that access to the inner value is properly synchronized.
///
/// # Memory Layout
///
/// This type is `repr(transparent)` and has the same layout as `UnsafeCell<T>`.
#[repr(transparent)]
pub(crate) struct SyncUnsafeCell<T: ?Sized>(UnsafeCell<T>);

// SAFETY: SyncUnsafeCell<T> is Sync if T is Send.
// - The UnsafeCell wrapper doesn't add thread-local state
// - Every access site is an `unsafe` allocator entry point whose contract
//   requires the caller to serialize access
// - T: Send ensures the value can be touched from whichever thread holds that right
unsafe impl<T: ?Sized + Send> Sync for SyncUnsafeCell<T> {}

impl<T> SyncUnsafeCell<T> {
    /// Creates a new `SyncUnsafeCell` containing the given value.
    #[inline]
    pub(crate) const fn new(value: T) -> Self {
        Self(UnsafeCell::new(value))
    }
}

impl<T: ?Sized> SyncUnsafeCell<T> {
    /// Gets a mutable pointer to the wrapped value.
    #[inline]
    pub(crate) fn get(&self) -> *mut T {
        self.0.get()
    }
}
