//! Micro-operation benchmarks for the cache hot paths.
//!
//! Run with: `cargo bench --bench acquire`
//!
//! Measures per-operation latency (nanoseconds) for resident hits, eviction
//! churn, a mixed workload, and the pin cycle, all single-threaded so the
//! numbers reflect path length rather than contention.

use std::hint::black_box;
use std::time::Instant;

use bufcache::cache::{BufferCache, CacheConfig};
use bufcache::device::{BlockKey, MemoryDevice};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const CAPACITY: usize = 256;
const PARTITIONS: usize = 13;
const BLOCK_SIZE: usize = 512;
const OPS: u64 = 10_000;

fn fresh_cache() -> BufferCache<MemoryDevice> {
    BufferCache::with_config(
        MemoryDevice::new(BLOCK_SIZE),
        CacheConfig::new(CAPACITY, PARTITIONS, BLOCK_SIZE),
    )
    .unwrap()
}

// populate every entry with a real identity so later acquires hit
fn warmed_cache() -> BufferCache<MemoryDevice> {
    let cache = fresh_cache();
    for block in 0..CAPACITY as u64 {
        let guard = cache.acquire(BlockKey::new(1, block));
        cache.release(guard);
    }
    cache
}

// ============================================================================
// Resident Hit Latency (ns/op)
// ============================================================================

fn bench_acquire_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("acquire_hit_ns");
    group.throughput(Throughput::Elements(OPS));

    group.bench_function("resident", |b| {
        b.iter_custom(|iters| {
            let cache = warmed_cache();
            let start = Instant::now();
            for _ in 0..iters {
                for i in 0..OPS {
                    let key = BlockKey::new(1, i % CAPACITY as u64);
                    let guard = cache.acquire(key);
                    black_box(guard.key());
                    cache.release(guard);
                }
            }
            start.elapsed()
        })
    });

    group.finish();
}

// ============================================================================
// Eviction Churn Latency (ns/op)
// ============================================================================

fn bench_acquire_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("acquire_churn_ns");
    group.throughput(Throughput::Elements(OPS));

    // every acquire misses and repurposes the oldest unreferenced entry
    group.bench_function("sequential_miss", |b| {
        b.iter_custom(|iters| {
            let cache = fresh_cache();
            let mut next_block = 0u64;
            let start = Instant::now();
            for _ in 0..iters {
                for _ in 0..OPS {
                    next_block += 1;
                    let guard = cache.acquire(BlockKey::new(2, next_block));
                    black_box(guard.key());
                    cache.release(guard);
                }
            }
            start.elapsed()
        })
    });

    group.finish();
}

// ============================================================================
// Mixed Workload (80% resident / 20% fresh)
// ============================================================================

fn bench_acquire_mixed(c: &mut Criterion) {
    let mut group = c.benchmark_group("acquire_mixed_ns");
    group.throughput(Throughput::Elements(OPS));

    group.bench_function("mixed_80_20", |b| {
        b.iter_custom(|iters| {
            let cache = warmed_cache();
            let mut rng = StdRng::seed_from_u64(42);
            let mut next_fresh = CAPACITY as u64;
            let start = Instant::now();
            for _ in 0..iters {
                for _ in 0..OPS {
                    let block = if rng.gen_range(0..100) < 80 {
                        rng.gen_range(0..CAPACITY as u64)
                    } else {
                        next_fresh += 1;
                        next_fresh
                    };
                    let guard = cache.acquire(BlockKey::new(1, block));
                    black_box(guard.key());
                    cache.release(guard);
                }
            }
            start.elapsed()
        })
    });

    group.finish();
}

// ============================================================================
// Pin Cycle (acquire, pin, release, unpin)
// ============================================================================

fn bench_pin_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("pin_cycle_ns");
    group.throughput(Throughput::Elements(OPS));

    group.bench_function("pin_unpin", |b| {
        b.iter_custom(|iters| {
            let cache = warmed_cache();
            let start = Instant::now();
            for _ in 0..iters {
                for i in 0..OPS {
                    let key = BlockKey::new(1, i % CAPACITY as u64);
                    let guard = cache.acquire(key);
                    cache.pin(&guard);
                    cache.release(guard);
                    cache.unpin(key);
                }
            }
            start.elapsed()
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_acquire_hit,
    bench_acquire_churn,
    bench_acquire_mixed,
    bench_pin_cycle
);
criterion_main!(benches);
