//! Utility functions shared by the allocator tiers
//!
//! - Word rounding for request sizes
//! - Exact ceiling log2 used by the size-class lookup
//! - Spin backoff for the bump cursor CAS loop

/// Size in bytes of the allocator's machine word.
///
/// Requests on every tier are rounded up to a multiple of this, free-list
/// links occupy exactly one word, and it is the block size of size class 0.
pub const WORD_SIZE: usize = 4;

/// Rounds a request size up to the next multiple of [`WORD_SIZE`].
///
/// Zero-sized requests take one word so that every grant has a distinct
/// address. Returns `None` if the rounding overflows.
///
/// # Examples
/// ```
/// use strata_memory::utils::round_to_word;
///
/// assert_eq!(round_to_word(0), Some(4));
/// assert_eq!(round_to_word(3), Some(4));
/// assert_eq!(round_to_word(5), Some(8));
/// assert_eq!(round_to_word(usize::MAX), None);
/// ```
#[inline(always)]
pub const fn round_to_word(size: usize) -> Option<usize> {
    if size == 0 {
        return Some(WORD_SIZE);
    }
    match size.checked_add(WORD_SIZE - 1) {
        Some(padded) => Some(padded & !(WORD_SIZE - 1)),
        None => None,
    }
}

/// Checks if a value is a non-zero multiple of [`WORD_SIZE`]
#[inline(always)]
pub const fn is_word_multiple(value: usize) -> bool {
    value != 0 && value % WORD_SIZE == 0
}

/// Exact `ceil(log2(x))`.
///
/// Built on count-leading-zeros so exact powers of two and values one past a
/// power of two land on different results. `0` and `1` both map to `0`.
///
/// # Examples
/// ```
/// use strata_memory::utils::ceil_log2;
///
/// assert_eq!(ceil_log2(4), 2);
/// assert_eq!(ceil_log2(5), 3);
/// assert_eq!(ceil_log2(8), 3);
/// assert_eq!(ceil_log2(9), 4);
/// ```
#[inline(always)]
pub const fn ceil_log2(x: usize) -> u32 {
    if x <= 1 {
        0
    } else {
        usize::BITS - (x - 1).leading_zeros()
    }
}

/// Backoff utility for spin loops
#[derive(Debug, Clone)]
pub struct Backoff {
    current: u32,
    max: u32,
}

impl Backoff {
    /// Create new backoff with default parameters
    #[inline]
    pub fn new() -> Self {
        Self {
            current: 1,
            max: 64,
        }
    }

    /// Perform backoff
    #[inline]
    pub fn spin(&mut self) {
        for _ in 0..self.current {
            core::hint::spin_loop();
        }
        if self.current < self.max {
            self.current = (self.current * 2).min(self.max);
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
