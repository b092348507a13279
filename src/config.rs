//! Ring buffer configuration

use crate::error::{Result, RingError};

/// Largest accepted capacity exponent; `2 << exponent` must still fit in `usize`
pub const MAX_CAPACITY_EXPONENT: u32 = usize::BITS - 2;

/// Default capacity exponent (64KB)
const DEFAULT_CAPACITY_EXPONENT: u32 = 16;

/// Default backing store label
const DEFAULT_LABEL: &str = "mirror-ring";

/// Returns the system page size, the granularity of virtual memory mappings.
#[cfg(unix)]
pub fn page_size() -> usize {
    rustix::param::page_size()
}

#[cfg(not(unix))]
pub fn page_size() -> usize {
    4096
}

/// Ring buffer configuration
#[derive(Clone, Debug)]
pub struct RingConfig {
    /// Capacity is `1 << capacity_exponent` bytes
    pub capacity_exponent: u32,
    /// Debug name given to the backing store (never a shared namespace entry)
    pub label: String,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            capacity_exponent: DEFAULT_CAPACITY_EXPONENT,
            label: DEFAULT_LABEL.to_string(),
        }
    }
}

impl RingConfig {
    /// Configuration for a `1 << capacity_exponent` byte buffer
    pub fn new(capacity_exponent: u32) -> Self {
        Self {
            capacity_exponent,
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Capacity in bytes
    ///
    /// Granularity is checked by the backing, which alone knows its own.
    pub fn capacity(&self) -> Result<usize> {
        if self.capacity_exponent > MAX_CAPACITY_EXPONENT {
            return Err(RingError::ExponentTooLarge {
                exponent: self.capacity_exponent,
                max: MAX_CAPACITY_EXPONENT,
            });
        }
        Ok(1usize << self.capacity_exponent)
    }
}
