//! Error types for MirrorRing

use std::io;
use thiserror::Error;

/// Result type for MirrorRing operations
pub type Result<T> = std::result::Result<T, RingError>;

/// Errors that can occur while allocating or driving a ring buffer
///
/// A full buffer on `write` and an empty buffer on `read` are not errors;
/// those report `0` and `None` respectively.
#[derive(Debug, Error)]
pub enum RingError {
    /// Failed to create the anonymous backing store
    #[error("Failed to create backing store '{label}': {source}")]
    StoreCreate {
        label: String,
        #[source]
        source: io::Error,
    },

    /// Failed to size the backing store
    #[error("Failed to set backing store size: {0}")]
    Truncate(#[source] io::Error),

    /// Failed to reserve the doubled address range
    #[error("Failed to reserve address space: {0}")]
    Reserve(#[source] io::Error),

    /// Failed to map one half of the doubled range
    #[error("Failed to map memory: {0}")]
    Mmap(#[source] io::Error),

    /// A fixed mapping did not land where it was asked to
    #[error("Mapping placed at 0x{got:X}, expected 0x{expected:X}")]
    MisplacedMapping { expected: usize, got: usize },

    /// Capacity below, or not a multiple of, the mapping granularity
    #[error("Capacity {capacity} is not a multiple of the {granularity}-byte mapping granularity")]
    CapacityTooSmall { capacity: usize, granularity: usize },

    /// Capacity is not a power of two
    #[error("Capacity {0} is not a power of two")]
    NotPowerOfTwo(usize),

    /// Capacity exponent does not fit the address space
    #[error("Capacity exponent too large: max {max}, got {exponent}")]
    ExponentTooLarge { exponent: u32, max: u32 },

    /// Heap allocation for the fallback backing failed
    #[error("Out of memory allocating {size} bytes")]
    OutOfMemory { size: usize },

    /// Committed more bytes than were free
    #[error("Write overrun: {free} bytes free, committed {requested}")]
    WriteOverrun { requested: usize, free: usize },

    /// Committed more bytes than were buffered
    #[error("Read overrun: {used} bytes used, committed {requested}")]
    ReadOverrun { requested: usize, used: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_os_errors_keep_source() {
        let err = RingError::Mmap(io::Error::from(io::ErrorKind::OutOfMemory));
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("Failed to map memory"));
    }

    #[test]
    fn test_overrun_message() {
        let err = RingError::ReadOverrun {
            requested: 12,
            used: 10,
        };
        assert_eq!(err.to_string(), "Read overrun: 10 bytes used, committed 12");
    }
}
