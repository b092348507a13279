//! Doubled virtual mapping of one anonymous shared memory store

use crate::backing::Backing;
use crate::config::{page_size, MAX_CAPACITY_EXPONENT};
use crate::error::{Result, RingError};
use rustix::fd::OwnedFd;
use rustix::fs::ftruncate;
use rustix::mm::{mmap, mmap_anonymous, munmap, MapFlags, ProtFlags};
use std::ptr::NonNull;

/// Handle to a `2 * capacity` address range whose halves map the same store
///
/// The store has no name in any namespace; once both mappings exist the
/// descriptor is closed and the memory lives exactly as long as this handle.
pub struct MirrorMap {
    base: NonNull<u8>,
    capacity: usize,
}

// SAFETY: MirrorMap exclusively owns its mappings; nothing else refers to them
unsafe impl Send for MirrorMap {}

impl MirrorMap {
    /// Create the store, reserve the doubled range and map both halves
    ///
    /// # Arguments
    /// * `capacity` - Size of one half; a power of two and a multiple of the page size
    /// * `label` - Debug name of the store
    pub fn new(capacity: usize, label: &str) -> Result<Self> {
        let map = Self::map(capacity, label).map_err(|err| {
            tracing::warn!(capacity, label, error = %err, "mirrored mapping failed");
            err
        })?;

        tracing::debug!(
            capacity,
            label,
            base = ?map.base,
            "mapped mirrored ring store"
        );
        Ok(map)
    }

    fn map(capacity: usize, label: &str) -> Result<Self> {
        if !capacity.is_power_of_two() {
            return Err(RingError::NotPowerOfTwo(capacity));
        }

        let granularity = page_size();
        if capacity < granularity || capacity % granularity != 0 {
            return Err(RingError::CapacityTooSmall {
                capacity,
                granularity,
            });
        }

        let span = capacity.checked_mul(2).ok_or(RingError::ExponentTooLarge {
            exponent: capacity.trailing_zeros(),
            max: MAX_CAPACITY_EXPONENT,
        })?;

        let fd = create_store(label)?;
        ftruncate(&fd, capacity as u64).map_err(|e| RingError::Truncate(e.into()))?;

        let reservation = Reservation::new(span)?;
        let base = reservation.addr.as_ptr();

        unsafe {
            map_half(base, capacity, &fd)?;
            map_half(base.add(capacity), capacity, &fd)?;
        }

        // `fd` closes on return; the two mappings keep the store alive
        Ok(Self {
            base: reservation.into_raw(),
            capacity,
        })
    }

    /// Get raw pointer to the start of the doubled range
    #[inline(always)]
    pub fn as_ptr(&self) -> *mut u8 {
        self.base.as_ptr()
    }

    /// Get size of one half
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// SAFETY: `base` spans `2 * capacity` mapped bytes until drop, capacity is a
// checked power of two, and both halves map the same store at offset 0
unsafe impl Backing for MirrorMap {
    fn allocate(capacity: usize, label: &str) -> Result<Self> {
        Self::new(capacity, label)
    }

    #[inline(always)]
    fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline(always)]
    fn base(&self) -> NonNull<u8> {
        self.base
    }

    // Both halves are the same physical pages
    #[inline(always)]
    fn mirror(&mut self, _start: usize, _len: usize) {}
}

impl Drop for MirrorMap {
    fn drop(&mut self) {
        // Unmap both halves at once
        let result = unsafe { munmap(self.base.as_ptr().cast(), self.capacity * 2) };
        match result {
            Ok(()) => tracing::trace!(capacity = self.capacity, "released mirrored ring store"),
            Err(err) => tracing::warn!(error = %err, "failed to unmap mirrored ring store"),
        }
    }
}

/// Address range reserved with no access rights, unmapped on drop unless claimed
struct Reservation {
    addr: NonNull<u8>,
    len: usize,
}

impl Reservation {
    fn new(len: usize) -> Result<Self> {
        let addr = unsafe {
            mmap_anonymous(
                std::ptr::null_mut(),
                len,
                ProtFlags::empty(),
                MapFlags::PRIVATE,
            )
            .map_err(|e| RingError::Reserve(e.into()))?
        };

        let addr = NonNull::new(addr.cast::<u8>()).ok_or_else(|| {
            RingError::Reserve(std::io::Error::other("mmap returned null"))
        })?;

        Ok(Self { addr, len })
    }

    fn into_raw(self) -> NonNull<u8> {
        let addr = self.addr;
        std::mem::forget(self);
        addr
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        // Also removes any half already mapped over the reservation
        let result = unsafe { munmap(self.addr.as_ptr().cast(), self.len) };
        if let Err(err) = result {
            tracing::warn!(len = self.len, error = %err, "failed to unmap address reservation");
        }
    }
}

/// Replace `capacity` reserved bytes at `addr` with a shared view of the store
///
/// # Safety
/// `addr..addr + capacity` must lie inside a reservation owned by the caller
unsafe fn map_half(addr: *mut u8, capacity: usize, fd: &OwnedFd) -> Result<()> {
    let got = mmap(
        addr.cast(),
        capacity,
        ProtFlags::READ | ProtFlags::WRITE,
        MapFlags::SHARED | MapFlags::FIXED,
        fd,
        0,
    )
    .map_err(|e| RingError::Mmap(e.into()))?;

    if got.cast::<u8>() != addr {
        if let Err(err) = munmap(got, capacity) {
            tracing::warn!(error = %err, "failed to unmap misplaced mapping");
        }
        return Err(RingError::MisplacedMapping {
            expected: addr as usize,
            got: got as usize,
        });
    }
    Ok(())
}

/// Anonymous store that is never reachable by name
#[cfg(any(target_os = "linux", target_os = "android"))]
fn create_store(label: &str) -> Result<OwnedFd> {
    use rustix::fs::{memfd_create, MemfdFlags};

    memfd_create(label, MemfdFlags::CLOEXEC).map_err(|e| RingError::StoreCreate {
        label: label.to_string(),
        source: e.into(),
    })
}

/// Create-then-unlink a POSIX shared memory object under a process-unique name
#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn create_store(label: &str) -> Result<OwnedFd> {
    use rustix::shm::{shm_open, shm_unlink, Mode, ShmOFlags};
    use std::sync::atomic::{AtomicU32, Ordering};

    static NEXT_STORE: AtomicU32 = AtomicU32::new(0);

    let name = format!(
        "/{}-{}-{}",
        label.replace('/', "_"),
        std::process::id(),
        NEXT_STORE.fetch_add(1, Ordering::Relaxed)
    );

    let fd = shm_open(
        name.as_str(),
        ShmOFlags::CREATE | ShmOFlags::EXCL | ShmOFlags::RDWR,
        Mode::RUSR | Mode::WUSR,
    )
    .map_err(|e| RingError::StoreCreate {
        label: label.to_string(),
        source: e.into(),
    })?;

    shm_unlink(name.as_str()).map_err(|e| RingError::StoreCreate {
        label: label.to_string(),
        source: e.into(),
    })?;

    Ok(fd)
}
