//! Operation counters, compiled in with the `metrics` feature.
//!
//! Counters are relaxed atomics bumped from inside the acquire and release
//! paths, so enabling the feature costs one uncontended fetch-add per
//! recorded event. Totals are monotonic and eventually consistent: a
//! snapshot taken while other threads run may catch an acquire whose hit
//! or miss has not landed yet.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters owned by a cache instance.
#[derive(Debug, Default)]
pub(crate) struct CacheMetrics {
    acquires: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    local_reclaims: AtomicU64,
    steals: AtomicU64,
    donor_skips: AtomicU64,
    rescans: AtomicU64,
    releases: AtomicU64,
    pins: AtomicU64,
    unpins: AtomicU64,
    device_reads: AtomicU64,
    device_writes: AtomicU64,
}

impl CacheMetrics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_acquire(&self) {
        self.acquires.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_local_reclaim(&self) {
        self.local_reclaims.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_steal(&self) {
        self.steals.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_donor_skip(&self) {
        self.donor_skips.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_rescan(&self) {
        self.rescans.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_release(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_pin(&self) {
        self.pins.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_unpin(&self) {
        self.unpins.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_device_read(&self) {
        self.device_reads.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_device_write(&self) {
        self.device_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(
        &self,
        capacity: usize,
        partition_count: usize,
        block_size: usize,
    ) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            acquires: self.acquires.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            local_reclaims: self.local_reclaims.load(Ordering::Relaxed),
            steals: self.steals.load(Ordering::Relaxed),
            donor_skips: self.donor_skips.load(Ordering::Relaxed),
            rescans: self.rescans.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            pins: self.pins.load(Ordering::Relaxed),
            unpins: self.unpins.load(Ordering::Relaxed),
            device_reads: self.device_reads.load(Ordering::Relaxed),
            device_writes: self.device_writes.load(Ordering::Relaxed),
            capacity,
            partition_count,
            block_size,
        }
    }
}

/// Point-in-time copy of the counters plus the cache's fixed geometry.
///
/// `hits + misses` equals `acquires` once all in-flight acquires have
/// resolved. `local_reclaims + steals` equals `misses`: every miss
/// repurposes exactly one entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheMetricsSnapshot {
    pub acquires: u64,
    pub hits: u64,
    pub misses: u64,
    pub local_reclaims: u64,
    pub steals: u64,
    pub donor_skips: u64,
    pub rescans: u64,
    pub releases: u64,
    pub pins: u64,
    pub unpins: u64,
    pub device_reads: u64,
    pub device_writes: u64,
    pub capacity: usize,
    pub partition_count: usize,
    pub block_size: usize,
}

impl CacheMetricsSnapshot {
    /// Hit fraction over resolved acquires, `None` before the first one.
    pub fn hit_rate(&self) -> Option<f64> {
        let resolved = self.hits + self.misses;
        if resolved == 0 {
            None
        } else {
            Some(self.hits as f64 / resolved as f64)
        }
    }
}

// --- Tests ---------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let metrics = CacheMetrics::new();
        let snap = metrics.snapshot(8, 2, 512);
        assert_eq!(snap.acquires, 0);
        assert_eq!(snap.hits, 0);
        assert_eq!(snap.capacity, 8);
        assert_eq!(snap.partition_count, 2);
        assert_eq!(snap.block_size, 512);
    }

    #[test]
    fn records_accumulate() {
        let metrics = CacheMetrics::new();
        metrics.record_acquire();
        metrics.record_acquire();
        metrics.record_hit();
        metrics.record_miss();
        metrics.record_steal();

        let snap = metrics.snapshot(4, 1, 64);
        assert_eq!(snap.acquires, 2);
        assert_eq!(snap.hits, 1);
        assert_eq!(snap.misses, 1);
        assert_eq!(snap.steals, 1);
        assert_eq!(snap.local_reclaims, 0);
    }

    #[test]
    fn hit_rate_handles_the_empty_case() {
        let metrics = CacheMetrics::new();
        assert_eq!(metrics.snapshot(1, 1, 1).hit_rate(), None);

        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();
        metrics.record_miss();
        assert_eq!(metrics.snapshot(1, 1, 1).hit_rate(), Some(0.5));
    }
}
