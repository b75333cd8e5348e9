//! The cache engine: partitioned lookup, LRU stealing, reference accounting.
//!
//! ## Architecture
//!
//! ```text
//!                         BufferCache<D>
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │ frames: Box<[Mutex<Frame>]>          (gate tier, by slot)    │
//!   │   ┌─────────────┬─────────────┬─────────────┬────────────┐   │
//!   │   │ bytes,valid │ bytes,valid │ bytes,valid │    ...     │   │
//!   │   └─────────────┴─────────────┴─────────────┴────────────┘   │
//!   │                                                              │
//!   │ partitions: Box<[Mutex<Partition>]>  (bookkeeping tier)      │
//!   │   ┌────────────────────────────┬───────────────────────────┐ │
//!   │   │ index: key -> NodeId       │ index: key -> NodeId      │ │
//!   │   │ recency: MRU ◄──► victim   │ recency: MRU ◄──► victim  │ │
//!   │   │   {key, slot, refcount}    │   {key, slot, refcount}   │ │
//!   │   └────────────────────────────┴───────────────────────────┘ │
//!   │            home = block mod partition_count                  │
//!   └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entry is split across the two tiers. The frame (payload bytes plus
//! the valid flag) is guarded by the slot's mutex, the exclusive-access
//! gate, which a holder keeps across device I/O. The metadata (key, slot,
//! refcount, recency position) lives in exactly one partition at a time and
//! is only touched under that partition's lock.
//!
//! ## Lock discipline
//!
//! - A partition lock protects bounded bookkeeping only; it is never held
//!   while blocking on a gate or on the device.
//! - The only blocking partition acquisition is the home partition, taken
//!   with no other lock held. Donor partitions are `try_lock`ed and skipped
//!   when contended, so no circular wait between partitions can form and at
//!   most two partition locks are held at once.
//! - The gate is always acquired with zero partition locks held. Concurrent
//!   acquirers of one block serialize there, not on partition scans.
//! - Under a partition lock, `refcount == 0` implies the entry's gate is
//!   free: entering the gate requires a refcount increment under that same
//!   lock first, and release drops the gate before decrementing. The steal
//!   path relies on this to flip `valid` off through a `try_lock` that must
//!   succeed.
//!
//! Exhaustion (a full contention-free scan finds every entry referenced)
//! and reference-count misuse are unrecoverable: the bookkeeping can no
//! longer be trusted, so both panic rather than return an error. Device
//! transfer failures are ordinary [`DeviceError`](crate::error::DeviceError)
//! results and pass through untouched.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::cache::config::CacheConfig;
use crate::cache::guard::BlockGuard;
use crate::device::{BlockDevice, BlockKey};
use crate::ds::{NodeId, PartitionSelector, RecencyList};
use crate::error::ConfigError;
#[cfg(feature = "metrics")]
use crate::metrics::{CacheMetrics, CacheMetricsSnapshot};

/// Gate-protected half of an entry: the payload and whether it reflects the
/// device contents.
#[derive(Debug)]
pub(crate) struct Frame {
    pub(crate) bytes: Box<[u8]>,
    pub(crate) valid: bool,
}

/// Partition-protected half of an entry.
#[derive(Debug)]
struct EntryMeta {
    key: BlockKey,
    slot: usize,
    refcount: u32,
}

#[derive(Debug)]
struct Partition {
    index: FxHashMap<BlockKey, NodeId>,
    recency: RecencyList<EntryMeta>,
}

impl Partition {
    fn with_capacity(hint: usize) -> Self {
        Self {
            index: FxHashMap::with_capacity_and_hasher(hint, Default::default()),
            recency: RecencyList::with_capacity(hint),
        }
    }

    /// First unreferenced entry from the least-recently-released end.
    fn victim(&self) -> Option<NodeId> {
        self.recency
            .iter_lru()
            .find_map(|(id, meta)| if meta.refcount == 0 { Some(id) } else { None })
    }
}

/// Fixed-capacity concurrent cache of device blocks.
///
/// All entries are allocated at construction and repurposed in place
/// forever after; eviction rewrites an unreferenced entry's identity rather
/// than freeing anything. Shared by reference (or `Arc`) across threads.
///
/// ```
/// use bufcache::cache::BufferCache;
/// use bufcache::device::{BlockKey, MemoryDevice};
///
/// let cache = BufferCache::new(MemoryDevice::new(1024));
/// let key = BlockKey::new(1, 42);
///
/// let mut guard = cache.acquire(key);
/// guard.fill().unwrap();
/// guard.data_mut()[0] = 7;
/// guard.flush().unwrap();
/// cache.release(guard);
///
/// assert!(cache.contains(key));
/// assert_eq!(cache.refcount(key), Some(0));
/// ```
pub struct BufferCache<D: BlockDevice> {
    device: D,
    frames: Box<[Mutex<Frame>]>,
    partitions: Box<[Mutex<Partition>]>,
    selector: PartitionSelector,
    block_size: usize,
    #[cfg(feature = "metrics")]
    metrics: CacheMetrics,
}

impl<D: BlockDevice> BufferCache<D> {
    /// Creates a cache over `device` with the default sizing.
    pub fn new(device: D) -> Self {
        Self::build(device, CacheConfig::default())
    }

    /// Creates a cache over `device` with explicit sizing.
    pub fn with_config(device: D, config: CacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(device, config))
    }

    fn build(device: D, config: CacheConfig) -> Self {
        let selector = PartitionSelector::new(config.partition_count);
        let frames: Box<[Mutex<Frame>]> = (0..config.capacity)
            .map(|_| {
                Mutex::new(Frame {
                    bytes: vec![0u8; config.block_size].into_boxed_slice(),
                    valid: false,
                })
            })
            .collect();

        let hint = config.capacity / config.partition_count + 1;
        let mut partitions: Vec<Partition> = (0..config.partition_count)
            .map(|_| Partition::with_capacity(hint))
            .collect();

        // Slots start out as ordinary entries under placeholder identities,
        // distributed by the same mapping acquire uses. Distinct block
        // numbers keep the one-entry-per-key invariant true from the start.
        for slot in 0..config.capacity {
            let key = BlockKey::new(0, slot as u64);
            let home = selector.partition_for(key.block);
            let node = partitions[home].recency.push_front(EntryMeta {
                key,
                slot,
                refcount: 0,
            });
            partitions[home].index.insert(key, node);
        }

        Self {
            device,
            frames,
            partitions: partitions.into_iter().map(Mutex::new).collect(),
            selector,
            block_size: config.block_size,
            #[cfg(feature = "metrics")]
            metrics: CacheMetrics::new(),
        }
    }

    /// Returns the fixed number of entries.
    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    /// Returns the number of partitions.
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Returns the payload size of every entry.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns `true` if `key` currently has a resident entry.
    pub fn contains(&self, key: BlockKey) -> bool {
        self.partitions[self.home_of(key)].lock().index.contains_key(&key)
    }

    /// Returns the reference count of `key`'s entry, if resident.
    pub fn refcount(&self, key: BlockKey) -> Option<u32> {
        let part = self.partitions[self.home_of(key)].lock();
        let node = *part.index.get(&key)?;
        part.recency.get(node).map(|meta| meta.refcount)
    }

    /// Acquires the entry for `key` with its exclusive-access gate held.
    ///
    /// Blocks while another holder has the gate. A resident key is a hit;
    /// otherwise an unreferenced entry is repurposed, preferring the home
    /// partition's own least-recently-released candidate, then stealing from
    /// the other partitions in rotation. The returned guard's payload is
    /// only marked valid if the entry was already resident and filled.
    ///
    /// # Panics
    ///
    /// Panics when every entry in the cache is referenced or pinned: the
    /// working set has outgrown the fixed capacity, which is a caller-side
    /// capacity or leak bug that retrying cannot fix.
    pub fn acquire(&self, key: BlockKey) -> BlockGuard<'_, D> {
        #[cfg(feature = "metrics")]
        self.metrics.record_acquire();

        let home_idx = self.home_of(key);
        let partition_count = self.partitions.len();

        loop {
            let mut home = self.partitions[home_idx].lock();

            if let Some(&node) = home.index.get(&key) {
                let meta = home
                    .recency
                    .get_mut(node)
                    .expect("index points to missing node");
                meta.refcount += 1;
                let slot = meta.slot;
                drop(home);
                #[cfg(feature = "metrics")]
                self.metrics.record_hit();
                return self.enter_gate(key, slot);
            }

            // Miss. Home stays locked so no concurrent miss can create a
            // second entry for this key. Its own list is searched first;
            // the lock is already held and no transfer is needed.
            if let Some(node) = home.victim() {
                let (slot, old_key) = {
                    let meta = home
                        .recency
                        .get_mut(node)
                        .expect("victim vanished from home partition");
                    let old_key = meta.key;
                    meta.key = key;
                    meta.refcount = 1;
                    (meta.slot, old_key)
                };
                home.index.remove(&old_key);
                home.index.insert(key, node);
                home.recency.move_to_front(node);
                self.invalidate_frame(slot);
                drop(home);
                #[cfg(feature = "metrics")]
                {
                    self.metrics.record_miss();
                    self.metrics.record_local_reclaim();
                }
                return self.enter_gate(key, slot);
            }

            // Donor rotation. try_lock only: a blocking acquisition here,
            // while home is held, is the classic reciprocal-wait deadlock.
            let mut skipped = false;
            for step in 1..partition_count {
                let donor_idx = (home_idx + step) % partition_count;
                let mut donor = match self.partitions[donor_idx].try_lock() {
                    Some(guard) => guard,
                    None => {
                        skipped = true;
                        #[cfg(feature = "metrics")]
                        self.metrics.record_donor_skip();
                        continue;
                    }
                };

                if let Some(node) = donor.victim() {
                    let mut meta = donor
                        .recency
                        .remove(node)
                        .expect("victim vanished from donor partition");
                    donor.index.remove(&meta.key);
                    // Flip valid off while the meta's owning partition is
                    // still locked; refcount == 0 guarantees the gate is
                    // free, so a racer for the new key cannot observe the
                    // old payload as valid.
                    self.invalidate_frame(meta.slot);
                    drop(donor);

                    meta.key = key;
                    meta.refcount = 1;
                    let slot = meta.slot;
                    let new_node = home.recency.push_front(meta);
                    home.index.insert(key, new_node);
                    drop(home);
                    #[cfg(feature = "metrics")]
                    {
                        self.metrics.record_miss();
                        self.metrics.record_steal();
                    }
                    return self.enter_gate(key, slot);
                }
            }

            if !skipped {
                panic!(
                    "no evictable entry for block {} (all {} entries referenced)",
                    key,
                    self.frames.len()
                );
            }

            // A contended partition was skipped, so this scan was not
            // conclusive. Let the holder finish its bounded critical
            // section and look again, starting over with the hit check:
            // a competitor may have inserted the key meanwhile.
            drop(home);
            #[cfg(feature = "metrics")]
            self.metrics.record_rescan();
            std::thread::yield_now();
        }
    }

    /// Consumes `guard`, releasing the gate and the caller's reference.
    ///
    /// Dropping the guard does the same work; this form exists so call
    /// sites can pair it visibly with [`acquire`](Self::acquire). An entry
    /// whose count reaches zero becomes the most-recently-released of its
    /// partition.
    pub fn release(&self, guard: BlockGuard<'_, D>) {
        drop(guard);
    }

    /// Adds a reference to the entry behind a held guard, keeping it
    /// resident after the guard is gone.
    ///
    /// Pairs with [`unpin`](Self::unpin). The partition lock is enough; the
    /// gate is not involved.
    pub fn pin(&self, guard: &BlockGuard<'_, D>) {
        let key = guard.key();
        let mut part = self.partitions[self.home_of(key)].lock();
        let node = match part.index.get(&key) {
            Some(&node) => node,
            None => panic!("pinned block {} is not resident", key),
        };
        let meta = part
            .recency
            .get_mut(node)
            .expect("index points to missing node");
        meta.refcount += 1;
        #[cfg(feature = "metrics")]
        self.metrics.record_pin();
    }

    /// Drops a reference previously added with [`pin`](Self::pin).
    ///
    /// Takes only the key: the pinning layer typically unpins long after it
    /// released the guard it pinned through. A pinned entry cannot be
    /// evicted, so the key is still resident whenever pin/unpin pairing was
    /// respected.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not resident or its reference count is already
    /// zero. Both mean an unpin without a matching pin.
    pub fn unpin(&self, key: BlockKey) {
        let mut part = self.partitions[self.home_of(key)].lock();
        let node = match part.index.get(&key) {
            Some(&node) => node,
            None => panic!("unpin of non-resident block {}", key),
        };
        let meta = part
            .recency
            .get_mut(node)
            .expect("index points to missing node");
        assert!(
            meta.refcount > 0,
            "unpin without matching pin for block {}",
            key
        );
        meta.refcount -= 1;
        #[cfg(feature = "metrics")]
        self.metrics.record_unpin();
    }

    /// Returns a snapshot of the operation counters.
    #[cfg(feature = "metrics")]
    pub fn metrics_snapshot(&self) -> CacheMetricsSnapshot {
        self.metrics
            .snapshot(self.capacity(), self.partition_count(), self.block_size)
    }

    #[inline]
    fn home_of(&self, key: BlockKey) -> usize {
        self.selector.partition_for(key.block)
    }

    fn enter_gate(&self, key: BlockKey, slot: usize) -> BlockGuard<'_, D> {
        let frame = self.frames[slot].lock();
        BlockGuard::new(self, key, slot, frame)
    }

    fn invalidate_frame(&self, slot: usize) {
        let mut frame = self.frames[slot]
            .try_lock()
            .expect("exclusive gate held on an unreferenced entry");
        frame.valid = false;
    }

    pub(crate) fn device(&self) -> &D {
        &self.device
    }

    #[cfg(feature = "metrics")]
    pub(crate) fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Bookkeeping half of a release; the guard has already dropped the
    /// gate. The key cannot have changed while our reference was counted,
    /// so it still resolves to the same entry.
    pub(crate) fn release_slot(&self, key: BlockKey, slot: usize) {
        let mut part = self.partitions[self.home_of(key)].lock();
        let node = match part.index.get(&key) {
            Some(&node) => node,
            None => panic!("released block {} is not resident", key),
        };
        let meta = part
            .recency
            .get_mut(node)
            .expect("index points to missing node");
        debug_assert_eq!(meta.slot, slot, "guard slot does not match resident entry");
        assert!(
            meta.refcount > 0,
            "refcount underflow on release of block {}",
            key
        );
        meta.refcount -= 1;
        if meta.refcount == 0 {
            part.recency.move_to_front(node);
        }
        #[cfg(feature = "metrics")]
        self.metrics.record_release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemoryDevice;

    fn cache(capacity: usize, partitions: usize) -> BufferCache<MemoryDevice> {
        BufferCache::with_config(
            MemoryDevice::new(64),
            CacheConfig::new(capacity, partitions, 64),
        )
        .unwrap()
    }

    #[test]
    fn construction_seeds_placeholder_entries() {
        let cache = cache(8, 2);
        assert_eq!(cache.capacity(), 8);
        assert_eq!(cache.partition_count(), 2);
        for slot in 0..8 {
            let key = BlockKey::new(0, slot);
            assert!(cache.contains(key));
            assert_eq!(cache.refcount(key), Some(0));
        }
    }

    #[test]
    fn hit_increments_refcount() {
        let cache = cache(4, 2);
        let key = BlockKey::new(0, 1);

        let first = cache.acquire(key);
        assert_eq!(cache.refcount(key), Some(1));
        cache.release(first);
        assert_eq!(cache.refcount(key), Some(0));
    }

    #[test]
    fn miss_reclaims_home_candidate_before_stealing() {
        let cache = cache(2, 2);
        // placeholder (0,0) sits in partition 0 unreferenced
        let guard = cache.acquire(BlockKey::new(1, 2));
        assert!(!cache.contains(BlockKey::new(0, 0)));
        assert!(cache.contains(BlockKey::new(0, 1)));
        assert_eq!(cache.refcount(BlockKey::new(1, 2)), Some(1));
        cache.release(guard);
    }

    #[test]
    fn miss_steals_across_partitions_when_home_is_referenced() {
        let cache = cache(2, 2);
        // occupy partition 0's only entry
        let held = cache.acquire(BlockKey::new(1, 0));
        assert!(!cache.contains(BlockKey::new(0, 0)));

        // second miss homing to partition 0 must steal partition 1's entry
        let stolen = cache.acquire(BlockKey::new(1, 2));
        assert!(!cache.contains(BlockKey::new(0, 1)));
        assert_eq!(cache.refcount(BlockKey::new(1, 2)), Some(1));
        assert_eq!(cache.refcount(BlockKey::new(1, 0)), Some(1));

        cache.release(stolen);
        cache.release(held);
    }

    #[test]
    fn release_order_drives_victim_choice() {
        let cache = cache(3, 1);
        // make (0,0) most recently released; back of the list is (0,1)
        let guard = cache.acquire(BlockKey::new(0, 0));
        cache.release(guard);

        let guard = cache.acquire(BlockKey::new(7, 10));
        assert!(!cache.contains(BlockKey::new(0, 1)));
        assert!(cache.contains(BlockKey::new(0, 0)));
        assert!(cache.contains(BlockKey::new(0, 2)));
        cache.release(guard);
    }

    #[test]
    fn referenced_entries_are_never_victims() {
        let cache = cache(2, 1);
        let a = cache.acquire(BlockKey::new(0, 0));
        let fresh = cache.acquire(BlockKey::new(3, 5));
        // only (0,1) was evictable
        assert!(!cache.contains(BlockKey::new(0, 1)));
        assert!(cache.contains(BlockKey::new(0, 0)));
        cache.release(fresh);
        cache.release(a);
    }

    #[test]
    #[should_panic(expected = "no evictable entry")]
    fn exhaustion_panics_when_every_entry_is_referenced() {
        let cache = cache(2, 2);
        let _a = cache.acquire(BlockKey::new(0, 0));
        let _b = cache.acquire(BlockKey::new(0, 1));
        let _c = cache.acquire(BlockKey::new(0, 2));
    }

    #[test]
    fn pin_survives_release_and_blocks_eviction() {
        let cache = cache(2, 1);
        let key = BlockKey::new(4, 2);

        let guard = cache.acquire(key);
        cache.pin(&guard);
        assert_eq!(cache.refcount(key), Some(2));
        cache.release(guard);
        assert_eq!(cache.refcount(key), Some(1));

        // churn the other entry; the pinned one must stay resident
        for block in 10..14 {
            let g = cache.acquire(BlockKey::new(4, block));
            cache.release(g);
        }
        assert!(cache.contains(key));

        cache.unpin(key);
        assert_eq!(cache.refcount(key), Some(0));
    }

    #[test]
    #[should_panic(expected = "unpin of non-resident block")]
    fn unpin_of_unknown_key_panics() {
        let cache = cache(2, 1);
        cache.unpin(BlockKey::new(9, 99));
    }

    #[test]
    #[should_panic(expected = "unpin without matching pin")]
    fn unpin_at_zero_refcount_panics() {
        let cache = cache(2, 1);
        let key = BlockKey::new(0, 0);
        let guard = cache.acquire(key);
        cache.release(guard);
        cache.unpin(key);
    }

    #[test]
    fn refcount_reports_non_resident_as_none() {
        let cache = cache(2, 1);
        assert_eq!(cache.refcount(BlockKey::new(8, 80)), None);
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn metrics_track_hits_and_misses() {
        let cache = cache(4, 2);

        let g = cache.acquire(BlockKey::new(0, 1)); // placeholder hit
        cache.release(g);
        let g = cache.acquire(BlockKey::new(9, 100)); // miss
        cache.release(g);

        let snap = cache.metrics_snapshot();
        assert_eq!(snap.acquires, 2);
        assert_eq!(snap.hits, 1);
        assert_eq!(snap.misses, 1);
        assert_eq!(snap.releases, 2);
        assert_eq!(snap.capacity, 4);
        assert_eq!(snap.partition_count, 2);
    }
}
