//! RAII handle over an acquired entry.
//!
//! A [`BlockGuard`] is the only way to touch payload bytes, so "holds the
//! exclusive-access gate" and "may read or write the payload" are the same
//! statement. Dropping the guard releases the gate first and then returns
//! the caller's reference, which keeps the rule that an unreferenced entry
//! never has a held gate.

use parking_lot::MutexGuard;

use crate::cache::manager::{BufferCache, Frame};
use crate::device::{BlockDevice, BlockKey};
use crate::error::DeviceError;

/// Exclusive handle to one cache entry, returned by
/// [`BufferCache::acquire`].
///
/// The payload starts invalid after an eviction; call [`fill`](Self::fill)
/// before reading if the block's device contents matter. Writes go to the
/// device only through [`flush`](Self::flush).
pub struct BlockGuard<'a, D: BlockDevice> {
    cache: &'a BufferCache<D>,
    key: BlockKey,
    slot: usize,
    // Some until drop; take() makes the gate-then-bookkeeping order explicit.
    frame: Option<MutexGuard<'a, Frame>>,
}

impl<'a, D: BlockDevice> BlockGuard<'a, D> {
    pub(crate) fn new(
        cache: &'a BufferCache<D>,
        key: BlockKey,
        slot: usize,
        frame: MutexGuard<'a, Frame>,
    ) -> Self {
        Self {
            cache,
            key,
            slot,
            frame: Some(frame),
        }
    }

    /// The block identity this guard was acquired for.
    #[inline]
    pub fn key(&self) -> BlockKey {
        self.key
    }

    /// Whether the payload currently reflects the device contents.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.frame_ref().valid
    }

    /// Read access to the payload bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.frame_ref().bytes
    }

    /// Write access to the payload bytes.
    ///
    /// Mutating the payload does not touch the device; pair with
    /// [`flush`](Self::flush) to persist.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.frame_mut().bytes
    }

    /// Ensures the payload holds the device contents, reading at most once.
    ///
    /// A no-op on an already valid payload, so repeated holders of a hot
    /// block never re-read it. On a read error the payload stays invalid
    /// and a later call retries.
    pub fn fill(&mut self) -> Result<&[u8], DeviceError> {
        let cache = self.cache;
        let key = self.key;
        let frame = self.frame.as_mut().expect("gate guard already released");
        if !frame.valid {
            cache.device().read_block(key, &mut frame.bytes)?;
            frame.valid = true;
            #[cfg(feature = "metrics")]
            cache.metrics().record_device_read();
        }
        Ok(&frame.bytes)
    }

    /// Writes the payload through to the device.
    ///
    /// The valid flag is left alone: flushing says nothing about whether
    /// the bytes came from the device in the first place.
    pub fn flush(&self) -> Result<(), DeviceError> {
        let frame = self.frame_ref();
        self.cache.device().write_block(self.key, &frame.bytes)?;
        #[cfg(feature = "metrics")]
        self.cache.metrics().record_device_write();
        Ok(())
    }

    #[inline]
    fn frame_ref(&self) -> &Frame {
        self.frame.as_ref().expect("gate guard already released")
    }

    #[inline]
    fn frame_mut(&mut self) -> &mut Frame {
        self.frame.as_mut().expect("gate guard already released")
    }
}

impl<D: BlockDevice> Drop for BlockGuard<'_, D> {
    fn drop(&mut self) {
        // Gate first, bookkeeping second. The reverse order would let a
        // stealer see refcount zero while the gate is still held.
        if let Some(frame) = self.frame.take() {
            drop(frame);
            self.cache.release_slot(self.key, self.slot);
        }
    }
}

impl<D: BlockDevice> std::fmt::Debug for BlockGuard<'_, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockGuard")
            .field("key", &format_args!("{}", self.key))
            .field("slot", &self.slot)
            .field("valid", &self.frame_ref().valid)
            .finish()
    }
}
