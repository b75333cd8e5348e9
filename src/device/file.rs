//! File-backed block device.
//!
//! One regular file holds one volume; block `n` lives at byte offset
//! `n * block_size`. Transfers use positioned reads and writes, so no seek
//! state is shared between threads and `&self` access is safe. The device
//! id in a [`BlockKey`] is not part of the addressing; callers that cache
//! blocks from several volumes route to the right `FileDevice` themselves.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::Path;

use crate::device::{BlockDevice, BlockKey};
use crate::error::DeviceError;

/// [`BlockDevice`] backed by a regular file with a fixed block count.
#[derive(Debug)]
pub struct FileDevice {
    file: File,
    block_size: usize,
    block_count: u64,
}

impl FileDevice {
    /// Creates (or truncates) the file at `path` sized to hold `block_count`
    /// blocks of `block_size` bytes. The file is extended sparsely; unwritten
    /// blocks read back as zeros.
    pub fn create(
        path: impl AsRef<Path>,
        block_size: usize,
        block_count: u64,
    ) -> Result<Self, DeviceError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|err| {
                DeviceError::with_source(format!("cannot create {}", path.display()), err)
            })?;
        file.set_len(block_size as u64 * block_count).map_err(|err| {
            DeviceError::with_source(format!("cannot size {}", path.display()), err)
        })?;
        Ok(Self {
            file,
            block_size,
            block_count,
        })
    }

    /// Opens an existing file at `path`; the block count is derived from the
    /// file length (a trailing partial block is not addressable).
    pub fn open(path: impl AsRef<Path>, block_size: usize) -> Result<Self, DeviceError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|err| {
                DeviceError::with_source(format!("cannot open {}", path.display()), err)
            })?;
        let len = file
            .metadata()
            .map_err(|err| {
                DeviceError::with_source(format!("cannot stat {}", path.display()), err)
            })?
            .len();
        Ok(Self {
            file,
            block_size,
            block_count: len / block_size as u64,
        })
    }

    /// Returns the block size this device expects.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the number of addressable blocks.
    pub fn block_count(&self) -> u64 {
        self.block_count
    }

    fn offset_of(&self, key: BlockKey, len: usize) -> Result<u64, DeviceError> {
        if len != self.block_size {
            return Err(DeviceError::new(format!(
                "buffer length {} does not match block size {} for block {}",
                len, self.block_size, key
            )));
        }
        if key.block >= self.block_count {
            return Err(DeviceError::new(format!(
                "block {} is out of range (device holds {} blocks)",
                key, self.block_count
            )));
        }
        Ok(key.block * self.block_size as u64)
    }
}

impl BlockDevice for FileDevice {
    fn read_block(&self, key: BlockKey, buf: &mut [u8]) -> Result<(), DeviceError> {
        let offset = self.offset_of(key, buf.len())?;
        self.file
            .read_exact_at(buf, offset)
            .map_err(|err| DeviceError::with_source(format!("read failed for block {}", key), err))
    }

    fn write_block(&self, key: BlockKey, buf: &[u8]) -> Result<(), DeviceError> {
        let offset = self.offset_of(key, buf.len())?;
        self.file
            .write_all_at(buf, offset)
            .map_err(|err| DeviceError::with_source(format!("write failed for block {}", key), err))
    }
}
