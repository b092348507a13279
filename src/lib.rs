//! MirrorRing - wrap-free fixed-capacity byte ring buffer
//!
//! The ring's store is mapped twice, back to back, into one contiguous
//! address range. A read or write that runs past the nominal end of the
//! ring simply continues into the second mapping, which aliases the start,
//! so no operation ever splits a copy or tests for wrap-around.
//!
//! # Architecture
//!
//! - **Backing**: anonymous shared memory mapped twice ([`MirrorMap`]), or a
//!   heap block kept coherent by split copies ([`HeapMirror`]) where double
//!   mapping is unavailable
//! - **Ring**: read/write offsets over the backing, with zero-copy views
//!
//! # Threading
//!
//! No internal synchronization. Wrap the ring in your own lock if a
//! producer and a consumer live on different threads.
//!
//! # Example
//!
//! ```
//! use mirror_ring::RingBuffer;
//!
//! let mut ring = RingBuffer::new(16)?;
//! assert_eq!(ring.write(b"hello"), 5);
//! assert_eq!(ring.read(5), Some(&b"hello"[..]));
//! assert_eq!(ring.read(5), None);
//! # Ok::<(), mirror_ring::RingError>(())
//! ```

pub mod error;
pub mod config;
pub mod backing;
#[cfg(unix)]
pub mod mirror;
pub mod heap;
pub mod ring;
pub mod bindings;

pub use error::{RingError, Result};
pub use config::{RingConfig, page_size};
pub use backing::{Backing, DefaultBacking};
#[cfg(unix)]
pub use mirror::MirrorMap;
pub use heap::HeapMirror;
pub use ring::RingBuffer;
