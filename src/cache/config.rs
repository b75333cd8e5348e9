//! Construction-time configuration for [`BufferCache`](crate::cache::BufferCache).

use crate::error::ConfigError;

/// Default number of cache entries.
pub const DEFAULT_CAPACITY: usize = 64;
/// Default number of partitions. A small prime keeps block numbers with a
/// common stride from piling into one partition.
pub const DEFAULT_PARTITION_COUNT: usize = 13;
/// Default payload size in bytes.
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

/// Sizing parameters, fixed for the cache's lifetime.
///
/// Capacity bounds the referenced working set: once every entry is
/// referenced or pinned, the next `acquire` of a non-resident block is a
/// fatal exhaustion. Partition count bounds lock contention and is chosen
/// independently of capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Total number of entries, allocated once at startup.
    pub capacity: usize,
    /// Number of partition locks the entries are spread over.
    pub partition_count: usize,
    /// Payload size of every entry, in bytes.
    pub block_size: usize,
}

impl CacheConfig {
    /// Creates a config with explicit sizing.
    pub fn new(capacity: usize, partition_count: usize, block_size: usize) -> Self {
        Self {
            capacity,
            partition_count,
            block_size,
        }
    }

    /// Checks that every parameter is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::new("capacity must be > 0"));
        }
        if self.partition_count == 0 {
            return Err(ConfigError::new("partition count must be > 0"));
        }
        if self.block_size == 0 {
            return Err(ConfigError::new("block size must be > 0"));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            partition_count: DEFAULT_PARTITION_COUNT,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}
