//! Power-of-two size-class pools
//!
//! Class `i` is a [`BlockPool`] of `4 << i` byte blocks. A request is rounded
//! up to a word multiple and routed to class `ceil(log2(size)) - 2`, so the
//! class serving it is at most twice the rounded size: internal fragmentation
//! stays under 2x in exchange for O(1) class selection.
//!
//! | rounded size | class | block size |
//! |--------------|-------|------------|
//! | 4            | 0     | 4          |
//! | 8            | 1     | 8          |
//! | 12, 16       | 2     | 16         |
//! | 20 ..= 32    | 3     | 32         |

use core::ptr::NonNull;

use super::block_pool::BlockPool;
use super::{AllocResult, Allocator};
use crate::utils::{WORD_SIZE, ceil_log2, round_to_word};

/// log2 of the smallest class's block size
const MIN_CLASS_SHIFT: u32 = WORD_SIZE.trailing_zeros();

/// Size class serving a request of `size` bytes.
///
/// The result may exceed the number of configured classes; callers treat
/// that as "no pool tier for this size". Sizes whose word rounding
/// overflows map to `usize::MAX`.
///
/// # Examples
/// ```
/// use strata_memory::allocator::size_class;
///
/// let classes: Vec<_> = [4, 5, 8, 9, 16, 17].into_iter().map(size_class).collect();
/// assert_eq!(classes, [0, 1, 1, 2, 2, 3]);
/// ```
#[inline]
pub fn size_class(size: usize) -> usize {
    match round_to_word(size) {
        Some(rounded) => (ceil_log2(rounded) - MIN_CLASS_SHIFT) as usize,
        None => usize::MAX,
    }
}

/// Block size of class `class`
#[inline]
pub const fn class_block_size(class: usize) -> usize {
    WORD_SIZE << class
}

/// Point-in-time view of one size class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassStats {
    /// Block size served by the class
    pub block_size: usize,
    /// Configured capacity
    pub block_count: u32,
    /// Blocks currently free
    pub free_count: u32,
}

impl ClassStats {
    /// Blocks currently handed out
    pub fn allocated(&self) -> u32 {
        self.block_count - self.free_count
    }
}

/// Ordered set of size-class pools
///
/// Not internally synchronized: every mutating call takes `&mut self`.
#[derive(Debug, Default)]
pub struct PoolSet {
    pools: Vec<BlockPool>,
}

impl PoolSet {
    /// Builds one pool per entry of `block_counts`, class `i` holding
    /// `block_counts[i]` blocks of `4 << i` bytes, all buffers taken from
    /// `source`.
    ///
    /// On error, buffers already taken for earlier classes are returned to
    /// `source`.
    pub fn new<A: Allocator + ?Sized>(block_counts: &[u32], source: &A) -> AllocResult<Self> {
        let mut pools = Vec::with_capacity(block_counts.len());

        for (class, &count) in block_counts.iter().enumerate() {
            match BlockPool::new(class_block_size(class), count, source) {
                Ok(pool) => pools.push(pool),
                Err(err) => {
                    for pool in pools {
                        // SAFETY: nothing has been handed out from these pools yet.
                        unsafe { pool.release(source) };
                    }
                    return Err(err);
                }
            }
        }

        Ok(Self { pools })
    }

    /// Allocates from the class serving `size`.
    ///
    /// Returns `None` when the size maps past the last class or the class is
    /// exhausted. Never tries a larger class.
    pub fn alloc(&mut self, size: usize) -> Option<NonNull<u8>> {
        let class = size_class(size);
        self.pools.get_mut(class)?.alloc()
    }

    /// Frees `ptr` into whichever class owns it.
    ///
    /// Classes are probed in order with a range test; returns `false` when
    /// no class claims `ptr`.
    ///
    /// # Safety
    /// If a class claims `ptr`, it must have been returned by [`PoolSet::alloc`]
    /// on this set and not freed since.
    pub unsafe fn dealloc(&mut self, ptr: NonNull<u8>) -> bool {
        match self.pools.iter_mut().find(|pool| pool.in_range(ptr)) {
            Some(pool) => {
                // SAFETY: forwarded from the caller.
                unsafe { pool.dealloc(ptr) };
                true
            }
            None => false,
        }
    }

    /// Index of the class whose buffer contains `ptr`
    pub fn owning_class(&self, ptr: NonNull<u8>) -> Option<usize> {
        self.pools.iter().position(|pool| pool.in_range(ptr))
    }

    /// Returns every class buffer to `source` and leaves the set empty.
    ///
    /// Afterwards `alloc` returns `None` and `dealloc` returns `false`.
    ///
    /// # Safety
    /// - `source` must be the allocator the set was created with
    /// - No block handed out by this set may be used afterwards
    pub unsafe fn release<A: Allocator + ?Sized>(&mut self, source: &A) {
        for pool in self.pools.drain(..) {
            // SAFETY: forwarded from the caller.
            unsafe { pool.release(source) };
        }
    }

    /// Number of configured classes (zero after release)
    #[inline]
    pub fn class_count(&self) -> usize {
        self.pools.len()
    }

    /// The pool for class `class`
    #[inline]
    pub fn pool(&self, class: usize) -> Option<&BlockPool> {
        self.pools.get(class)
    }

    /// Largest request the set can serve
    pub fn max_block_size(&self) -> Option<usize> {
        self.pools.last().map(BlockPool::block_size)
    }

    /// Snapshot of every class
    pub fn class_stats(&self) -> Vec<ClassStats> {
        self.pools
            .iter()
            .map(|pool| ClassStats {
                block_size: pool.block_size(),
                block_count: pool.block_count(),
                free_count: pool.free_count(),
            })
            .collect()
    }
}
