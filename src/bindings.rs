//! C Bindings for MirrorRing
//!
//! Provides a raw C API over [`RingBuffer`] on the platform backing.
//! Pointers returned by the accessors are valid until the next commit,
//! read or free on the same handle.

use crate::ring::RingBuffer;
use std::ptr;
use std::slice;

// Opaque handle
pub struct MirrorRingHandle(RingBuffer);

/// Create a ring of `1 << order` bytes
///
/// Returns null if the order is out of range or mapping fails.
#[no_mangle]
pub extern "C" fn mirror_ring_new(order: usize) -> *mut MirrorRingHandle {
    let Ok(order) = u32::try_from(order) else {
        return ptr::null_mut();
    };

    match RingBuffer::new(order) {
        Ok(ring) => Box::into_raw(Box::new(MirrorRingHandle(ring))),
        Err(_) => ptr::null_mut(),
    }
}

/// Destroy a ring handle
///
/// # Safety
/// `handle` must come from `mirror_ring_new` and not be used afterwards
#[no_mangle]
pub unsafe extern "C" fn mirror_ring_free(handle: *mut MirrorRingHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Pointer to the write area; valid for `mirror_ring_free_space` bytes
///
/// # Safety
/// `handle` must be a live handle
#[no_mangle]
pub unsafe extern "C" fn mirror_ring_write_pointer(handle: *mut MirrorRingHandle) -> *mut u8 {
    let ring = &mut (*handle).0;
    ring.write_ptr()
}

/// Pointer to the buffered data; valid for `mirror_ring_used` bytes
///
/// # Safety
/// `handle` must be a live handle
#[no_mangle]
pub unsafe extern "C" fn mirror_ring_read_pointer(handle: *const MirrorRingHandle) -> *const u8 {
    let ring = &(*handle).0;
    ring.read_ptr()
}

/// Publish `size` bytes placed at the write pointer
///
/// Returns false, changing nothing, if `size` exceeds the free space.
///
/// # Safety
/// `handle` must be a live handle
#[no_mangle]
pub unsafe extern "C" fn mirror_ring_commit_write(handle: *mut MirrorRingHandle, size: usize) -> bool {
    let ring = &mut (*handle).0;
    ring.commit_write(size).is_ok()
}

/// Consume `size` buffered bytes
///
/// Returns false, changing nothing, if `size` exceeds the used space.
///
/// # Safety
/// `handle` must be a live handle
#[no_mangle]
pub unsafe extern "C" fn mirror_ring_commit_read(handle: *mut MirrorRingHandle, size: usize) -> bool {
    let ring = &mut (*handle).0;
    ring.commit_read(size).is_ok()
}

/// Copy `size` bytes in; returns `size`, or 0 if they do not fit
///
/// # Safety
/// `handle` must be a live handle and `data` valid for `size` bytes
#[no_mangle]
pub unsafe extern "C" fn mirror_ring_write(
    handle: *mut MirrorRingHandle,
    data: *const u8,
    size: usize,
) -> usize {
    let ring = &mut (*handle).0;
    if size == 0 {
        return 0;
    }
    let data = slice::from_raw_parts(data, size);
    ring.write(data)
}

/// Consume up to `size` bytes and return a pointer to them, null if empty
///
/// # Safety
/// `handle` must be a live handle
#[no_mangle]
pub unsafe extern "C" fn mirror_ring_read(handle: *mut MirrorRingHandle, size: usize) -> *const u8 {
    let ring = &mut (*handle).0;
    match ring.read(size) {
        Some(data) => data.as_ptr(),
        None => ptr::null(),
    }
}

/// Capacity in bytes
///
/// # Safety
/// `handle` must be a live handle
#[no_mangle]
pub unsafe extern "C" fn mirror_ring_size(handle: *const MirrorRingHandle) -> usize {
    (*handle).0.capacity()
}

/// Bytes buffered
///
/// # Safety
/// `handle` must be a live handle
#[no_mangle]
pub unsafe extern "C" fn mirror_ring_used(handle: *const MirrorRingHandle) -> usize {
    (*handle).0.used()
}

/// Bytes that can still be written
///
/// # Safety
/// `handle` must be a live handle
#[no_mangle]
pub unsafe extern "C" fn mirror_ring_free_space(handle: *const MirrorRingHandle) -> usize {
    (*handle).0.free()
}

/// Discard buffered data
///
/// # Safety
/// `handle` must be a live handle
#[no_mangle]
pub unsafe extern "C" fn mirror_ring_clear(handle: *mut MirrorRingHandle) {
    (*handle).0.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_api_roundtrip() {
        let data = b"test data\0";

        unsafe {
            let handle = mirror_ring_new(16);
            assert!(!handle.is_null());
            assert_eq!(mirror_ring_size(handle), 1 << 16);

            assert_eq!(mirror_ring_write(handle, data.as_ptr(), data.len()), data.len());
            assert_eq!(mirror_ring_used(handle), data.len());

            // Peek twice
            for _ in 0..2 {
                let peek = slice::from_raw_parts(mirror_ring_read_pointer(handle), data.len());
                assert_eq!(peek, data);
            }

            let read = mirror_ring_read(handle, data.len());
            assert_eq!(slice::from_raw_parts(read, data.len()), data);
            assert_eq!(mirror_ring_used(handle), 0);
            assert!(mirror_ring_read(handle, data.len()).is_null());

            mirror_ring_free(handle);
        }
    }

    #[test]
    fn test_c_api_commits() {
        unsafe {
            let handle = mirror_ring_new(16);
            assert!(!handle.is_null());
            let size = mirror_ring_size(handle);

            let dst = mirror_ring_write_pointer(handle);
            ptr::copy_nonoverlapping(b"abcd".as_ptr(), dst, 4);
            assert!(mirror_ring_commit_write(handle, 4));
            assert!(!mirror_ring_commit_write(handle, size));
            assert_eq!(mirror_ring_free_space(handle), size - 4);

            assert!(!mirror_ring_commit_read(handle, 5));
            assert!(mirror_ring_commit_read(handle, 2));
            assert_eq!(*mirror_ring_read_pointer(handle), b'c');

            mirror_ring_clear(handle);
            assert_eq!(mirror_ring_used(handle), 0);

            mirror_ring_free(handle);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_c_api_rejects_small_order() {
        assert!(mirror_ring_new(2).is_null());
        assert!(mirror_ring_new(usize::MAX).is_null());
        unsafe { mirror_ring_free(ptr::null_mut()) };
    }
}
