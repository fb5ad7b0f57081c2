//! Fixed-size block pool
//!
//! One contiguous buffer cut into equally sized blocks, with the free blocks
//! threaded into a singly linked list that lives inside the blocks themselves.
//!
//! # Memory Layout
//! ```text
//! [Block0][Block1][Block2][Block3]...[BlockN]
//!    ↓       ↓       ↓       ↓           ↓
//! [free] → [free] → [used] → [free] → [used] → NIL
//! ```
//!
//! The link stored in a free block's first word is the *index* of the next
//! free block (`u32`, [`NIL`] for the last), not its address. A word is four
//! bytes on every target, so the 4-byte size class can hold its own link.
//!
//! A freed block's former contents are destroyed: its first word now holds
//! free-list metadata, and a dangling read observes that link.
//!
//! ## Invariants
//!
//! - `free_count <= block_count`
//! - The list reachable from `free_head` has exactly `free_count` nodes, all
//!   inside `[start_addr, end_addr)`
//! - `block_size` is a non-zero multiple of [`WORD_SIZE`]

use core::ptr::NonNull;

use super::{AllocError, AllocResult, Allocator};
use crate::utils::{WORD_SIZE, is_word_multiple};

/// Free-list terminator
pub const NIL: u32 = u32::MAX;

/// Allocator for blocks of a single size
///
/// # Leaks
/// The pool does not remember its source, so dropping it does not return the
/// buffer. [`BlockPool::release`] is the only teardown path; a pool dropped
/// without it leaks its buffer (harmless for an arena source, which reclaims
/// everything when it is dropped).
///
/// ```
/// use strata_memory::allocator::{BlockPool, SystemAllocator};
///
/// let mut pool = BlockPool::new(16, 8, &SystemAllocator)?;
/// let block = pool.alloc().expect("fresh pool has free blocks");
/// // SAFETY: `block` came from this pool and is freed once.
/// unsafe { pool.dealloc(block) };
/// // SAFETY: same source as `new`; no block is used afterwards.
/// unsafe { pool.release(&SystemAllocator) };
/// # Ok::<(), strata_memory::MemoryError>(())
/// ```
pub struct BlockPool {
    /// Start of the buffer; dangling when `block_count == 0`
    memory: NonNull<u8>,
    start_addr: usize,
    end_addr: usize,
    block_size: usize,
    block_count: u32,
    free_count: u32,
    free_head: u32,
}

impl BlockPool {
    /// Creates a pool of `block_count` blocks of `block_size` bytes, taking
    /// its buffer from `source`.
    ///
    /// # Errors
    /// - `block_size` is not a non-zero multiple of [`WORD_SIZE`]
    /// - `block_count` is [`NIL`] (reserved as the list terminator)
    /// - the buffer size overflows, or `source` cannot supply it
    pub fn new<A: Allocator + ?Sized>(
        block_size: usize,
        block_count: u32,
        source: &A,
    ) -> AllocResult<Self> {
        if !is_word_multiple(block_size) {
            return Err(AllocError::invalid_layout(
                "block size must be a non-zero multiple of the word size",
            ));
        }
        if block_count == NIL {
            return Err(AllocError::invalid_layout("block count collides with NIL"));
        }

        if block_count == 0 {
            let memory = NonNull::dangling();
            let addr = memory.as_ptr() as usize;
            return Ok(Self {
                memory,
                start_addr: addr,
                end_addr: addr,
                block_size,
                block_count: 0,
                free_count: 0,
                free_head: NIL,
            });
        }

        let bytes = block_size
            .checked_mul(block_count as usize)
            .ok_or_else(|| AllocError::size_overflow("block pool buffer"))?;

        // SAFETY: the buffer is initialized below before any block is handed out.
        let memory = unsafe { source.allocate(bytes)? };
        let start_addr = memory.as_ptr() as usize;

        let mut pool = Self {
            memory,
            start_addr,
            end_addr: start_addr + bytes,
            block_size,
            block_count,
            free_count: block_count,
            free_head: 0,
        };
        pool.link_all();
        Ok(pool)
    }

    /// Threads every block into the free list in address order
    fn link_all(&mut self) {
        for index in 0..self.block_count {
            let next = if index + 1 < self.block_count {
                index + 1
            } else {
                NIL
            };
            // SAFETY: index < block_count, so the block lies inside our buffer.
            unsafe { self.write_link(index, next) };
        }
        self.free_head = 0;
        self.free_count = self.block_count;
    }

    #[inline]
    fn block_ptr(&self, index: u32) -> *mut u8 {
        debug_assert!(index < self.block_count);
        // SAFETY: index < block_count keeps the offset inside the buffer.
        unsafe { self.memory.as_ptr().add(index as usize * self.block_size) }
    }

    /// # Safety
    /// `index < block_count`, and the block must not be in use by a client.
    #[inline]
    unsafe fn write_link(&mut self, index: u32, next: u32) {
        // SAFETY: the block is ours and at least one word long.
        unsafe { self.block_ptr(index).cast::<u32>().write_unaligned(next) };
    }

    /// # Safety
    /// `index < block_count`, and the block must be on the free list.
    #[inline]
    unsafe fn read_link(&self, index: u32) -> u32 {
        // SAFETY: free blocks always carry a link in their first word.
        unsafe { self.block_ptr(index).cast::<u32>().read_unaligned() }
    }

    /// Pops a block off the free list. O(1).
    ///
    /// Returns `None` when the pool is exhausted; the caller escalates to
    /// the next tier.
    pub fn alloc(&mut self) -> Option<NonNull<u8>> {
        if self.free_count == 0 {
            return None;
        }

        let index = self.free_head;
        debug_assert!(index < self.block_count, "free list corrupted");

        // SAFETY: free_count > 0 means free_head names a free block.
        self.free_head = unsafe { self.read_link(index) };
        self.free_count -= 1;

        NonNull::new(self.block_ptr(index))
    }

    /// Pushes a block back onto the free list. O(1).
    ///
    /// # Safety
    /// - `ptr` must have been returned by [`BlockPool::alloc`] on this pool
    /// - `ptr` must not currently be free (double free corrupts the list;
    ///   debug builds catch it only when it overflows `block_count`)
    /// - The block's first word is overwritten; its contents are lost
    pub unsafe fn dealloc(&mut self, ptr: NonNull<u8>) {
        let addr = ptr.as_ptr() as usize;
        debug_assert!(self.in_range(ptr), "pointer not owned by this pool");
        debug_assert_eq!(
            (addr - self.start_addr) % self.block_size,
            0,
            "pointer not at a block boundary"
        );
        debug_assert!(self.free_count < self.block_count, "double free detected");

        let index = ((addr - self.start_addr) / self.block_size) as u32;
        // SAFETY: caller guarantees the block is allocated from this pool.
        unsafe { self.write_link(index, self.free_head) };
        self.free_head = index;
        self.free_count += 1;
    }

    /// `true` iff `ptr` lies in `[start_addr, end_addr)`.
    ///
    /// Pure membership: says nothing about whether the block is allocated.
    #[inline]
    pub fn in_range(&self, ptr: NonNull<u8>) -> bool {
        let addr = ptr.as_ptr() as usize;
        addr >= self.start_addr && addr < self.end_addr
    }

    /// Returns the buffer to `source`. The pool is consumed.
    ///
    /// # Safety
    /// - `source` must be the allocator the pool was created with
    /// - No block handed out by this pool may be used afterwards
    pub unsafe fn release<A: Allocator + ?Sized>(self, source: &A) {
        if self.block_count > 0 {
            // SAFETY: the buffer came from `source.allocate` in `new`.
            unsafe { source.deallocate(self.memory) };
        }
    }

    /// Size of each block
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Total number of blocks
    #[inline]
    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    /// Blocks currently on the free list
    #[inline]
    pub fn free_count(&self) -> u32 {
        self.free_count
    }

    /// Blocks currently handed out
    #[inline]
    pub fn allocated_count(&self) -> u32 {
        self.block_count - self.free_count
    }

    /// `true` when no block is free
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.free_count == 0
    }

    /// `(start_addr, end_addr)` of the buffer
    #[inline]
    pub fn buffer_range(&self) -> (usize, usize) {
        (self.start_addr, self.end_addr)
    }

    /// Walks the free list and checks it against `free_count`.
    ///
    /// O(`block_count`); meant for tests and debug assertions.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.free_count > self.block_count {
            return Err("free count exceeds block count");
        }

        let mut seen = 0u32;
        let mut cursor = self.free_head;
        while cursor != NIL {
            if cursor >= self.block_count {
                return Err("free list link out of range");
            }
            seen += 1;
            if seen > self.free_count {
                return Err("free list longer than free count");
            }
            // SAFETY: cursor < block_count and reachable from free_head.
            cursor = unsafe { self.read_link(cursor) };
        }

        if seen == self.free_count {
            Ok(())
        } else {
            Err("free list shorter than free count")
        }
    }
}

impl core::fmt::Debug for BlockPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BlockPool")
            .field("block_size", &self.block_size)
            .field("block_count", &self.block_count)
            .field("free_count", &self.free_count)
            .finish_non_exhaustive()
    }
}

// SAFETY: BlockPool is Send because:
// - It is the only owner of its buffer's blocks while they are free
// - All mutation goes through `&mut self`, so moving it between threads
//   cannot introduce a race
unsafe impl Send for BlockPool {}

const _: () = assert!(WORD_SIZE == core::mem::size_of::<u32>());
