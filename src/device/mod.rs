//! Block-device boundary: the collaborator that moves whole blocks between
//! a durable store and memory.
//!
//! The cache calls exactly one operation shape: transfer one block in a
//! given direction, blocking until the device finishes or reports
//! failure. Transfer failures propagate to the caller unchanged as
//! [`DeviceError`](crate::error::DeviceError); retry policy belongs to the
//! device or to the layer above the cache, never to the cache itself.
//!
//! Two implementations ship with the crate: [`MemoryDevice`] for tests,
//! demos, and benches, and [`FileDevice`] backed by a regular file.

pub mod file;
pub mod memory;

pub use file::FileDevice;
pub use memory::MemoryDevice;

use std::fmt;

use crate::error::DeviceError;

/// Identity of one cached block: owning device plus block number.
///
/// Renders as `device:block`.
///
/// ```
/// use bufcache::device::BlockKey;
///
/// assert_eq!(BlockKey::new(1, 42).to_string(), "1:42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKey {
    pub device: u32,
    pub block: u64,
}

impl BlockKey {
    /// Creates a key for `block` on `device`.
    pub const fn new(device: u32, block: u64) -> Self {
        Self { device, block }
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.device, self.block)
    }
}

/// Blocking single-block transfer primitive.
///
/// `buf` always has exactly the cache's configured block size. Both calls
/// take `&self`: implementations are shared across threads and do their own
/// interior locking where they need it.
pub trait BlockDevice: Send + Sync {
    /// Reads the block identified by `key` into `buf`.
    fn read_block(&self, key: BlockKey, buf: &mut [u8]) -> Result<(), DeviceError>;

    /// Writes `buf` to the block identified by `key`.
    fn write_block(&self, key: BlockKey, buf: &[u8]) -> Result<(), DeviceError>;
}
