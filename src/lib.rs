//! bufcache: fixed-capacity concurrent cache for fixed-size device blocks.
//!
//! Lookup is partitioned by block number; eviction repurposes the
//! least-recently-released unreferenced entry, stealing across partitions
//! when the home partition has none. Each entry carries an exclusive-access
//! gate that holders keep across device reads and writes, so at most one
//! thread works on a given block at a time.
//!
//! See `DESIGN.md` for the locking rules and internal architecture.

pub mod cache;
pub mod device;
pub mod ds;
pub mod error;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod prelude;
