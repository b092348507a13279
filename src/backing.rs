//! Platform boundary between the offset engine and the memory it runs over

use crate::error::Result;
use std::ptr::NonNull;

/// Memory laid out as two adjacent, coherent copies of one `capacity`-byte store
///
/// # Safety
///
/// [`crate::RingBuffer`] hands out slices over this memory from safe code,
/// so implementors must guarantee:
/// - `capacity()` is a nonzero power of two and never changes.
/// - `base()` never changes and is valid for reads and writes of
///   `2 * capacity()` bytes for as long as the backing lives.
/// - For every `x < capacity()`, the bytes at `base + x` and
///   `base + capacity + x` read back the same once [`Backing::mirror`] has
///   run over the span that wrote either of them.
///
/// ```
/// use mirror_ring::{Backing, HeapMirror, Result, RingBuffer};
/// use std::ptr::NonNull;
///
/// // Delegating to a backing that already keeps the contract keeps it too
/// struct Counted(HeapMirror, usize);
///
/// unsafe impl Backing for Counted {
///     fn allocate(capacity: usize, label: &str) -> Result<Self> {
///         Ok(Counted(HeapMirror::allocate(capacity, label)?, 0))
///     }
///     fn capacity(&self) -> usize { self.0.capacity() }
///     fn base(&self) -> NonNull<u8> { self.0.base() }
///     fn mirror(&mut self, start: usize, len: usize) {
///         self.1 += len;
///         self.0.mirror(start, len);
///     }
/// }
///
/// let mut rb = RingBuffer::from_backing(Counted::allocate(64, "counted")?);
/// rb.write(b"abc");
/// assert_eq!(rb.backing().1, 3);
/// # Ok::<(), mirror_ring::RingError>(())
/// ```
///
/// Implementing it without `unsafe` does not compile:
///
/// ```compile_fail
/// use mirror_ring::{Backing, Result, RingBuffer};
/// use std::ptr::NonNull;
///
/// struct Dangling;
///
/// impl Backing for Dangling {
///     fn allocate(_: usize, _: &str) -> Result<Self> { Ok(Dangling) }
///     fn capacity(&self) -> usize { 1 << 20 }
///     fn base(&self) -> NonNull<u8> { NonNull::dangling() }
///     fn mirror(&mut self, _: usize, _: usize) {}
/// }
///
/// RingBuffer::from_backing(Dangling).write(b"boom");
/// ```
pub unsafe trait Backing: Sized {
    /// Allocate a backing of exactly `capacity` bytes per half
    fn allocate(capacity: usize, label: &str) -> Result<Self>;

    /// Bytes in one half
    fn capacity(&self) -> usize;

    /// Start of the `2 * capacity` addressable bytes
    fn base(&self) -> NonNull<u8>;

    /// Make bytes written at `[start, start + len)` visible through their alias.
    ///
    /// The ring only calls this with `start + len <= 2 * capacity` and
    /// `len <= capacity`; other spans must not touch memory outside the backing.
    fn mirror(&mut self, start: usize, len: usize);
}

/// Backing used by [`crate::RingBuffer::new`]
#[cfg(unix)]
pub type DefaultBacking = crate::mirror::MirrorMap;

#[cfg(not(unix))]
pub type DefaultBacking = crate::heap::HeapMirror;
