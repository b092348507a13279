//! Portable fallback backing: two heap copies kept coherent by split copies
//!
//! Used where no double mapping facility exists. Each committed write is
//! copied into the opposite half, split at the capacity boundary, so the
//! offset engine sees the same contiguous layout as with [`crate::MirrorMap`].

use crate::backing::Backing;
use crate::config::MAX_CAPACITY_EXPONENT;
use crate::error::{Result, RingError};
use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

/// Cache line size
const CACHE_LINE_SIZE: usize = 64;

/// Heap block of `2 * capacity` bytes
pub struct HeapMirror {
    base: NonNull<u8>,
    capacity: usize,
    layout: Layout,
}

// SAFETY: HeapMirror exclusively owns its allocation
unsafe impl Send for HeapMirror {}

impl HeapMirror {
    /// Allocate a zeroed block for a `capacity`-byte ring
    pub fn new(capacity: usize) -> Result<Self> {
        if !capacity.is_power_of_two() {
            return Err(RingError::NotPowerOfTwo(capacity));
        }

        let size = capacity
            .checked_mul(2)
            .ok_or(RingError::ExponentTooLarge {
                exponent: capacity.trailing_zeros(),
                max: MAX_CAPACITY_EXPONENT,
            })?;
        let layout = Layout::from_size_align(size, CACHE_LINE_SIZE)
            .map_err(|_| RingError::OutOfMemory { size })?;

        let ptr = unsafe { alloc_zeroed(layout) };
        let base = NonNull::new(ptr).ok_or(RingError::OutOfMemory { size })?;

        tracing::debug!(capacity, "allocated heap mirror");
        Ok(Self {
            base,
            capacity,
            layout,
        })
    }
}

// SAFETY: `base` owns `2 * capacity` bytes for the life of the value, capacity
// is a checked power of two, and `mirror` copies every span into its alias
unsafe impl Backing for HeapMirror {
    fn allocate(capacity: usize, _label: &str) -> Result<Self> {
        Self::new(capacity)
    }

    #[inline(always)]
    fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline(always)]
    fn base(&self) -> NonNull<u8> {
        self.base
    }

    #[inline]
    fn mirror(&mut self, start: usize, len: usize) {
        let cap = self.capacity;
        let end = start.checked_add(len).filter(|&end| len <= cap && end <= cap * 2);
        let Some(end) = end else {
            panic!("mirror span {start}+{len} outside {cap}-byte ring");
        };

        let base = self.base.as_ptr();

        unsafe {
            // Part in the low half goes up
            let low_end = end.min(cap);
            if start < low_end {
                std::ptr::copy_nonoverlapping(base.add(start), base.add(start + cap), low_end - start);
            }

            // Part in the high half goes down
            let high_start = start.max(cap);
            if high_start < end {
                std::ptr::copy_nonoverlapping(
                    base.add(high_start),
                    base.add(high_start - cap),
                    end - high_start,
                );
            }
        }
    }
}

impl Drop for HeapMirror {
    fn drop(&mut self) {
        unsafe {
            dealloc(self.base.as_ptr(), self.layout);
        }
    }
}
