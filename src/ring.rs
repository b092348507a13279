//! Offset engine over a doubled backing
//!
//! The backing exposes `2 * capacity` contiguous bytes whose halves alias,
//! so any span of at most `capacity` bytes starting below `capacity` is a
//! plain slice. Offsets only ever need folding back, never splitting.
//!
//! Invariants kept by every safe method:
//! - `read_offset < capacity`
//! - `read_offset <= write_offset <= read_offset + capacity`

use crate::backing::{Backing, DefaultBacking};
use crate::config::RingConfig;
use crate::error::{Result, RingError};
use std::fmt;
use std::slice;

/// Fixed-capacity byte ring with wrap-free reads and writes
///
/// Not synchronized: share it across threads only behind your own lock.
pub struct RingBuffer<B: Backing = DefaultBacking> {
    backing: B,
    capacity: usize,
    write_offset: usize,
    read_offset: usize,
}

impl RingBuffer<DefaultBacking> {
    /// Create a ring of `1 << capacity_exponent` bytes on the platform backing
    pub fn new(capacity_exponent: u32) -> Result<Self> {
        Self::with_config(&RingConfig::new(capacity_exponent))
    }

    pub fn with_config(config: &RingConfig) -> Result<Self> {
        Self::allocate(config)
    }
}

impl<B: Backing> RingBuffer<B> {
    /// Create a ring on an explicitly chosen backing
    pub fn allocate(config: &RingConfig) -> Result<Self> {
        let capacity = config.capacity()?;
        let backing = B::allocate(capacity, &config.label)?;
        Ok(Self::from_backing(backing))
    }

    /// Wrap an already allocated backing; the ring starts empty
    pub fn from_backing(backing: B) -> Self {
        Self {
            capacity: backing.capacity(),
            backing,
            write_offset: 0,
            read_offset: 0,
        }
    }

    /// Total bytes the ring can hold
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes written and not yet read
    #[inline(always)]
    pub fn used(&self) -> usize {
        self.write_offset - self.read_offset
    }

    /// Bytes that can be written before the ring is full
    #[inline(always)]
    pub fn free(&self) -> usize {
        self.capacity - self.used()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.write_offset == self.read_offset
    }

    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.used() == self.capacity
    }

    /// Raw pointer to the next byte to write
    ///
    /// Valid for `free()` bytes until the next commit, read or drop.
    #[inline(always)]
    pub fn write_ptr(&mut self) -> *mut u8 {
        unsafe { self.backing.base().as_ptr().add(self.write_offset) }
    }

    /// Raw pointer to the next byte to read
    ///
    /// Valid for `used()` bytes until the next commit, read or drop.
    #[inline(always)]
    pub fn read_ptr(&self) -> *const u8 {
        unsafe { self.backing.base().as_ptr().add(self.read_offset) }
    }

    /// The free region, contiguous even when it crosses the end of the ring
    ///
    /// Bytes placed here become readable after [`RingBuffer::commit_write`].
    #[inline]
    pub fn write_slice(&mut self) -> &mut [u8] {
        let len = self.free();
        unsafe { slice::from_raw_parts_mut(self.write_ptr(), len) }
    }

    /// The buffered bytes, without consuming them
    #[inline]
    pub fn peek(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.read_ptr(), self.used()) }
    }

    /// Publish `n` bytes placed at the write position
    #[inline]
    pub fn commit_write(&mut self, n: usize) -> Result<()> {
        let free = self.free();
        if n > free {
            return Err(RingError::WriteOverrun { requested: n, free });
        }
        unsafe { self.commit_write_unchecked(n) };
        Ok(())
    }

    /// Publish `n` bytes without checking them against `free()`
    ///
    /// # Safety
    /// `n <= self.free()`. Larger values break the offset invariants and let
    /// later slices reach past the mapping.
    #[inline]
    pub unsafe fn commit_write_unchecked(&mut self, n: usize) {
        debug_assert!(n <= self.free(), "commit_write({n}) with {} free", self.free());

        let start = self.write_offset;
        self.write_offset += n;
        self.backing.mirror(start, n);
    }

    /// Consume `n` buffered bytes
    #[inline]
    pub fn commit_read(&mut self, n: usize) -> Result<()> {
        let used = self.used();
        if n > used {
            return Err(RingError::ReadOverrun { requested: n, used });
        }
        unsafe { self.commit_read_unchecked(n) };
        Ok(())
    }

    /// Consume `n` bytes without checking them against `used()`
    ///
    /// # Safety
    /// `n <= self.used()`.
    #[inline]
    pub unsafe fn commit_read_unchecked(&mut self, n: usize) {
        debug_assert!(n <= self.used(), "commit_read({n}) with {} used", self.used());

        self.read_offset += n;

        // Fold both offsets back into the first half; `used` is unchanged
        if self.read_offset >= self.capacity {
            self.read_offset -= self.capacity;
            self.write_offset -= self.capacity;
        }
    }

    /// Copy `data` in and commit it
    ///
    /// All or nothing: returns `0` without touching the ring if
    /// `data` does not fit in `free()`.
    #[inline]
    pub fn write(&mut self, data: &[u8]) -> usize {
        let len = data.len();
        if self.free() < len {
            return 0;
        }

        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), self.write_ptr(), len);
            self.commit_write_unchecked(len);
        }
        len
    }

    /// Consume up to `n` bytes and return them
    ///
    /// Returns `None` when the ring is empty. Requests larger than `used()`
    /// are clamped to `used()`.
    #[inline]
    pub fn read(&mut self, n: usize) -> Option<&[u8]> {
        if self.is_empty() {
            return None;
        }

        let len = n.min(self.used());
        let ptr = self.read_ptr();
        unsafe {
            self.commit_read_unchecked(len);
            // Consumed bytes stay intact until the next write, which needs `&mut self`
            Some(slice::from_raw_parts(ptr, len))
        }
    }

    /// Copy buffered bytes into `buf` and consume them
    ///
    /// Returns the number of bytes copied.
    #[inline]
    pub fn read_into(&mut self, buf: &mut [u8]) -> usize {
        let len = buf.len().min(self.used());
        buf[..len].copy_from_slice(&self.peek()[..len]);
        unsafe { self.commit_read_unchecked(len) };
        len
    }

    /// Discard everything buffered; the backing is kept
    #[inline]
    pub fn clear(&mut self) {
        self.write_offset = 0;
        self.read_offset = 0;
    }

    /// The backing this ring runs over
    pub fn backing(&self) -> &B {
        &self.backing
    }
}

impl<B: Backing> fmt::Debug for RingBuffer<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("used", &self.used())
            .field("read_offset", &self.read_offset)
            .field("write_offset", &self.write_offset)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::HeapMirror;

    // Same checks on every backing
    macro_rules! backing_tests {
        ($name:ident, $backing:ty, $exponent:expr) => {
            mod $name {
                use super::*;

                fn ring() -> RingBuffer<$backing> {
                    RingBuffer::<$backing>::allocate(&RingConfig::new($exponent)).unwrap()
                }

                #[test]
                fn test_starts_empty() {
                    let rb = ring();
                    assert_eq!(rb.capacity(), 1 << $exponent);
                    assert_eq!(rb.used(), 0);
                    assert_eq!(rb.free(), rb.capacity());
                    assert!(rb.is_empty());
                    assert!(rb.peek().is_empty());
                }

                #[test]
                fn test_zero_copy_write() {
                    let mut rb = ring();
                    assert_eq!(rb.write_slice().len(), rb.capacity());

                    rb.write_slice()[..5].copy_from_slice(b"hello");
                    assert_eq!(rb.used(), 0);
                    rb.commit_write(5).unwrap();

                    assert_eq!(rb.peek(), b"hello");
                    assert_eq!(rb.write_slice().len(), rb.capacity() - 5);
                }

                #[test]
                fn test_commit_overruns_rejected() {
                    let mut rb = ring();
                    let cap = rb.capacity();

                    assert!(matches!(
                        rb.commit_write(cap + 1),
                        Err(RingError::WriteOverrun { free, .. }) if free == cap
                    ));
                    assert_eq!(rb.used(), 0);

                    rb.write(b"abc");
                    assert!(matches!(
                        rb.commit_read(4),
                        Err(RingError::ReadOverrun { requested: 4, used: 3 })
                    ));
                    assert_eq!(rb.used(), 3);
                }

                #[test]
                fn test_commit_read_folds_offsets() {
                    let mut rb = ring();
                    let cap = rb.capacity();

                    rb.commit_write(cap).unwrap();
                    rb.commit_read(cap - 1).unwrap();
                    assert_eq!(rb.read_offset, cap - 1);

                    rb.commit_write(10).unwrap();
                    assert_eq!(rb.write_offset, cap + 10);

                    rb.commit_read(1).unwrap();
                    assert_eq!(rb.read_offset, 0);
                    assert_eq!(rb.write_offset, 10);
                    assert_eq!(rb.used(), 10);
                }

                #[test]
                fn test_write_slice_crosses_end() {
                    let mut rb = ring();
                    let cap = rb.capacity();

                    rb.commit_write(cap - 3).unwrap();
                    rb.commit_read(cap - 3).unwrap();

                    let dst = rb.write_slice();
                    assert_eq!(dst.len(), cap);
                    dst[..6].copy_from_slice(b"spread");
                    rb.commit_write(6).unwrap();

                    assert_eq!(rb.peek(), b"spread");
                    assert_eq!(rb.read(6), Some(&b"spread"[..]));
                    assert!(rb.is_empty());
                }

                #[test]
                fn test_read_clamps_to_used() {
                    let mut rb = ring();
                    rb.write(b"short");
                    assert_eq!(rb.read(100), Some(&b"short"[..]));
                    assert_eq!(rb.used(), 0);
                    assert_eq!(rb.read(1), None);
                }

                #[test]
                fn test_read_into() {
                    let mut rb = ring();
                    rb.write(b"0123456789");

                    let mut buf = [0u8; 4];
                    assert_eq!(rb.read_into(&mut buf), 4);
                    assert_eq!(&buf, b"0123");
                    assert_eq!(rb.used(), 6);

                    let mut big = [0u8; 32];
                    assert_eq!(rb.read_into(&mut big), 6);
                    assert_eq!(&big[..6], b"456789");
                    assert_eq!(rb.read_into(&mut big), 0);
                }

                #[test]
                fn test_write_zero_bytes() {
                    let mut rb = ring();
                    assert_eq!(rb.write(&[]), 0);
                    assert!(rb.is_empty());
                }

                #[cfg(debug_assertions)]
                #[test]
                #[should_panic(expected = "commit_read")]
                fn test_unchecked_overrun_halts_in_debug() {
                    let mut rb = ring();
                    unsafe { rb.commit_read_unchecked(1) };
                }
            }
        };
    }

    backing_tests!(heap, HeapMirror, 6);

    #[cfg(unix)]
    backing_tests!(mirror, crate::mirror::MirrorMap, 16);

    #[test]
    fn test_debug_shows_offsets_not_contents() {
        let mut rb = RingBuffer::new(16).unwrap();
        rb.write(b"secret");
        let out = format!("{rb:?}");
        assert!(out.contains("used: 6"));
        assert!(!out.contains("secret"));
    }

    #[test]
    fn test_exponent_too_large() {
        let result = RingBuffer::new(usize::BITS);
        assert!(matches!(result, Err(RingError::ExponentTooLarge { .. })));
    }

    #[test]
    fn test_from_backing() {
        let rb = RingBuffer::from_backing(HeapMirror::new(32).unwrap());
        assert_eq!(rb.capacity(), 32);
        assert_eq!(rb.backing().capacity(), 32);
    }
}
