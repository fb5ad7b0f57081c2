//! Tiered allocator
//!
//! One context object owning three tiers, picked per call by a [`Tier`] tag:
//!
//! - **arena**: the lock-free [`BumpArena`]; never freed individually
//! - **pooled**: a [`PoolSet`] of power-of-two classes whose buffers are
//!   carved from the same arena at construction
//! - **heap**: the C runtime heap via [`SystemAllocator`]
//!
//! A failed arena or pooled attempt is retried on the heap, so the only
//! failure a caller sees is heap exhaustion.
//!
//! # Memory Layout
//! ```text
//! arena_start                                          arena_end
//! |[class 0][class 1]...[class n-1]|[bump grants] -> cursor    |
//!  <------- pool backing --------->
//! ```
//!
//! # Deallocation routing
//!
//! `deallocate(p)` with `p` inside the arena is offered to the pools; if no
//! class claims it (bump memory) or the pools are released, it is a no-op.
//! Anything outside the arena goes to the heap.
//!
//! # Thread Safety
//!
//! The arena tier is safe to call from any number of threads. The pooled
//! tier is not internally synchronized: callers serialize pooled
//! allocations, all deallocations of in-arena pointers, and `release`
//! behind their own lock. That obligation is the safety contract of the
//! `unsafe` entry points below.
//!
//! The `released` check in `deallocate` and the pool probe that follows are
//! two separate steps. A `release` racing an in-flight `deallocate` can free
//! the pool metadata under the probe; callers must stop freeing pooled
//! pointers before calling `release`.

use core::fmt;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "logging")]
use tracing::{debug, info};

use super::{AllocError, AllocResult, Allocator, BumpArena, ClassStats, PoolSet, SystemAllocator};
use crate::core::{SyncUnsafeCell, TieredConfig};
use crate::error::MemoryResult;
use crate::trace::{AllocEvent, AllocLogger, default_logger};
use crate::utils::{WORD_SIZE, round_to_word};

/// Which tier an allocation should be served from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Lock-free bump region
    Arena,
    /// Power-of-two size-class pools
    Pooled,
    /// General-purpose heap
    Heap,
}

impl Tier {
    /// Lowercase tier name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Arena => "arena",
            Self::Pooled => "pooled",
            Self::Heap => "heap",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arena + pools + heap behind one allocate/deallocate pair
pub struct TieredAllocator {
    arena: BumpArena,
    pools: SyncUnsafeCell<PoolSet>,
    heap: SystemAllocator,
    released: AtomicBool,
    debug: bool,
    logger: Box<dyn AllocLogger>,
    config: TieredConfig,
}

impl TieredAllocator {
    /// Creates an allocator using the default logger
    ///
    /// # Errors
    /// - the configuration fails [`TieredConfig::validate`]
    /// - the system refuses the arena buffer
    pub fn new(config: TieredConfig) -> MemoryResult<Self> {
        Self::build(config, default_logger())
    }

    /// Creates an allocator that sends trace records to `logger`
    ///
    /// The logger only sees events when `config.debug` is set.
    pub fn with_logger(
        config: TieredConfig,
        logger: impl AllocLogger + 'static,
    ) -> MemoryResult<Self> {
        Self::build(config, Box::new(logger))
    }

    fn build(config: TieredConfig, logger: Box<dyn AllocLogger>) -> MemoryResult<Self> {
        config.validate()?;

        let arena = BumpArena::new(config.arena_size)?;
        // Pool buffers are bump-allocated from the arena they sub-allocate
        // from; validate() guarantees they fit.
        let pools = PoolSet::new(&config.class_block_counts, &arena)?;

        #[cfg(feature = "logging")]
        debug!(
            arena_size = config.arena_size,
            classes = pools.class_count(),
            pool_backing = arena.used(),
            debug = config.debug,
            "tiered allocator created"
        );

        Ok(Self {
            arena,
            pools: SyncUnsafeCell::new(pools),
            heap: SystemAllocator::new(),
            released: AtomicBool::new(false),
            debug: config.debug,
            logger,
            config,
        })
    }

    /// Allocates `size` bytes from `tier`, falling back to the heap.
    ///
    /// The size is rounded up to a multiple of [`WORD_SIZE`] (zero becomes
    /// one word). The returned pointer is word-aligned.
    ///
    /// # Errors
    /// [`AllocError::AllocationFailed`] when the heap cannot serve the
    /// request, or the rounded size overflows.
    ///
    /// # Safety
    /// For [`Tier::Pooled`], no other pooled allocation, in-arena
    /// `deallocate`, or `release` on this allocator may run concurrently.
    /// The arena and heap tiers have no such requirement.
    pub unsafe fn allocate(&self, size: usize, tier: Tier) -> AllocResult<NonNull<u8>> {
        let (result, fallback) = match (round_to_word(size), tier) {
            (None, _) => (Err(AllocError::allocation_failed(size, WORD_SIZE)), false),
            (Some(rounded), Tier::Heap) => (self.heap_alloc(rounded), false),
            (Some(rounded), Tier::Arena) => match self.arena.try_bump(rounded) {
                Some(ptr) => (Ok(ptr), false),
                None => (self.heap_alloc(rounded), true),
            },
            (Some(rounded), Tier::Pooled) => {
                // SAFETY: forwarded from the caller.
                match unsafe { self.pool_alloc(rounded) } {
                    Some(ptr) => (Ok(ptr), false),
                    None => (self.heap_alloc(rounded), true),
                }
            }
        };

        if self.debug {
            self.logger.log(&AllocEvent {
                tier,
                requested: size,
                address: result.as_ref().ok().map(|ptr| ptr.as_ptr() as usize),
                fallback,
            });
        }

        result
    }

    /// Frees memory returned by [`TieredAllocator::allocate`].
    ///
    /// In-arena pointers go to the owning pool class, or nowhere if they are
    /// bump grants or the pools have been released. Other pointers go to the
    /// heap.
    ///
    /// # Safety
    /// - `ptr` must come from `allocate` on this allocator and not be freed
    ///   since
    /// - no pooled allocation, other in-arena `deallocate`, or `release` may
    ///   run concurrently when `ptr` lies inside the arena
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        if self.arena.contains(ptr.as_ptr() as usize) {
            if !self.released.load(Ordering::Acquire) {
                // SAFETY: access to the pool set is serialized by the caller;
                // a claimed pointer came from its `alloc`.
                unsafe { (*self.pools.get()).dealloc(ptr) };
            }
            return;
        }

        // SAFETY: outside the arena means the heap handed it out.
        unsafe { self.heap.deallocate(ptr) };
    }

    /// Releases the pool storage. Idempotent.
    ///
    /// Afterwards pooled requests fall back to the heap and in-arena
    /// deallocations are no-ops. Bump memory stays valid until the
    /// allocator is dropped.
    ///
    /// # Safety
    /// - no pooled block may be used after this call
    /// - no pooled allocation or in-arena `deallocate` may run concurrently
    pub unsafe fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }

        // SAFETY: access serialized by the caller; the pools were built from
        // `self.arena`.
        let pools = unsafe { &mut *self.pools.get() };
        #[cfg(feature = "logging")]
        let classes = pools.class_count();
        // SAFETY: forwarded from the caller.
        unsafe { pools.release(&self.arena) };

        #[cfg(feature = "logging")]
        info!(
            classes,
            arena_used = self.arena.used(),
            "tiered allocator pools released"
        );
    }

    /// Whether [`TieredAllocator::release`] has been called
    #[inline]
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Total bytes in the bump region
    #[inline]
    pub fn arena_capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Bytes reserved so far, pool backing included
    #[inline]
    pub fn arena_used(&self) -> usize {
        self.arena.used()
    }

    /// Bytes left for bump grants
    #[inline]
    pub fn arena_available(&self) -> usize {
        self.arena.available()
    }

    /// `(start, end)` addresses of the arena
    #[inline]
    pub fn arena_range(&self) -> (usize, usize) {
        (self.arena.start_addr(), self.arena.end_addr())
    }

    /// Whether `ptr` lies inside the arena
    #[inline]
    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        self.arena.contains(ptr.as_ptr() as usize)
    }

    /// Snapshot of every size class; empty once released.
    ///
    /// # Safety
    /// No pooled allocation, in-arena `deallocate`, or `release` may run
    /// concurrently.
    pub unsafe fn class_stats(&self) -> Vec<ClassStats> {
        // SAFETY: forwarded from the caller.
        unsafe { (*self.pools.get()).class_stats() }
    }

    /// The configuration this allocator was built with
    #[inline]
    pub fn config(&self) -> &TieredConfig {
        &self.config
    }

    #[inline]
    fn heap_alloc(&self, size: usize) -> AllocResult<NonNull<u8>> {
        // SAFETY: the pointer is only ever freed through `deallocate`, which
        // routes out-of-arena pointers back to `self.heap`.
        unsafe { self.heap.allocate(size) }
    }

    /// # Safety
    /// Pool access must be serialized by the caller.
    #[inline]
    unsafe fn pool_alloc(&self, size: usize) -> Option<NonNull<u8>> {
        if self.released.load(Ordering::Acquire) {
            return None;
        }
        // SAFETY: forwarded from the caller.
        unsafe { (*self.pools.get()).alloc(size) }
    }
}

impl fmt::Debug for TieredAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TieredAllocator")
            .field("arena", &self.arena)
            .field("released", &self.is_released())
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<TieredAllocator>();
};
