//! One-stop imports for the common surface.
//!
//! ```
//! use bufcache::prelude::*;
//!
//! let cache = BufferCache::new(MemoryDevice::new(1024));
//! let guard = cache.acquire(BlockKey::new(0, 7));
//! cache.release(guard);
//! ```

pub use crate::cache::{BlockGuard, BufferCache, CacheConfig};
pub use crate::device::{BlockDevice, BlockKey, FileDevice, MemoryDevice};
pub use crate::ds::{NodeId, PartitionSelector, RecencyList};
pub use crate::error::{ConfigError, DeviceError};

#[cfg(feature = "metrics")]
pub use crate::metrics::CacheMetricsSnapshot;
