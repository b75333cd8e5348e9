//! In-memory block device.
//!
//! Sparse map of written blocks; a block that was never written reads back
//! as zeros, like a fresh disk. Clones share the same backing storage, so a
//! test can hand one clone to the cache and keep another to inspect what
//! actually hit the device.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::device::{BlockDevice, BlockKey};
use crate::error::DeviceError;

/// Sparse in-memory [`BlockDevice`].
///
/// ```
/// use bufcache::device::{BlockDevice, BlockKey, MemoryDevice};
///
/// let dev = MemoryDevice::new(16);
/// let key = BlockKey::new(0, 3);
///
/// let mut buf = [0u8; 16];
/// dev.read_block(key, &mut buf).unwrap();
/// assert_eq!(buf, [0u8; 16]);
///
/// dev.write_block(key, &[7u8; 16]).unwrap();
/// dev.read_block(key, &mut buf).unwrap();
/// assert_eq!(buf, [7u8; 16]);
/// ```
#[derive(Debug, Clone)]
pub struct MemoryDevice {
    blocks: Arc<Mutex<FxHashMap<BlockKey, Box<[u8]>>>>,
    block_size: usize,
}

impl MemoryDevice {
    /// Creates an empty device for blocks of `block_size` bytes.
    pub fn new(block_size: usize) -> Self {
        Self {
            blocks: Arc::new(Mutex::new(FxHashMap::default())),
            block_size,
        }
    }

    /// Returns the block size this device expects.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the number of blocks that have been written.
    pub fn written_blocks(&self) -> usize {
        self.blocks.lock().len()
    }

    fn check_len(&self, key: BlockKey, len: usize) -> Result<(), DeviceError> {
        if len != self.block_size {
            return Err(DeviceError::new(format!(
                "buffer length {} does not match block size {} for block {}",
                len, self.block_size, key
            )));
        }
        Ok(())
    }
}

impl BlockDevice for MemoryDevice {
    fn read_block(&self, key: BlockKey, buf: &mut [u8]) -> Result<(), DeviceError> {
        self.check_len(key, buf.len())?;
        match self.blocks.lock().get(&key) {
            Some(bytes) => buf.copy_from_slice(bytes),
            None => buf.fill(0),
        }
        Ok(())
    }

    fn write_block(&self, key: BlockKey, buf: &[u8]) -> Result<(), DeviceError> {
        self.check_len(key, buf.len())?;
        self.blocks.lock().insert(key, buf.into());
        Ok(())
    }
}
