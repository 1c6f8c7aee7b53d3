//! Benchmarks comparing redwood containers against std::collections::BTreeMap.
//!
//! Run with: cargo bench
//!
//! Both trees are pre-allocated where the API allows, for fair comparison.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

use redwood::{TreeMap, TreeMultiset};

const SIZE: usize = 100_000;

fn shuffled_keys(n: usize) -> Vec<u64> {
    let mut rng = SmallRng::seed_from_u64(12345);
    (0..n).map(|_| rng.random()).collect()
}

// ============================================================================
// Insert Benchmarks
// ============================================================================

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_random");
    group.throughput(Throughput::Elements(SIZE as u64));

    let keys = shuffled_keys(SIZE);
    let mut map: TreeMap<u64, u64> = TreeMap::with_capacity(SIZE);

    group.bench_function("redwood", |b| {
        b.iter(|| {
            for &k in &keys {
                black_box(map.insert(k, k));
            }
            map.clear();
        });
    });

    group.bench_function("btreemap", |b| {
        let mut std_map = BTreeMap::new();
        b.iter(|| {
            for &k in &keys {
                black_box(std_map.insert(k, k));
            }
            std_map.clear();
        });
    });

    group.finish();
}

// ============================================================================
// Lookup Benchmarks
// ============================================================================

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_hit");
    group.throughput(Throughput::Elements(SIZE as u64));

    let keys = shuffled_keys(SIZE);
    let map: TreeMap<u64, u64> = keys.iter().map(|&k| (k, k)).collect();
    let std_map: BTreeMap<u64, u64> = keys.iter().map(|&k| (k, k)).collect();

    group.bench_function("redwood", |b| {
        b.iter(|| {
            for k in &keys {
                black_box(map.get(k));
            }
        });
    });

    group.bench_function("btreemap", |b| {
        b.iter(|| {
            for k in &keys {
                black_box(std_map.get(k));
            }
        });
    });

    group.finish();
}

// ============================================================================
// Remove + Reinsert (steady-state churn)
// ============================================================================

fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("churn");
    group.throughput(Throughput::Elements(SIZE as u64));

    let keys = shuffled_keys(SIZE);

    group.bench_function("redwood", |b| {
        let mut map: TreeMap<u64, u64> = keys.iter().map(|&k| (k, k)).collect();
        b.iter(|| {
            for &k in &keys {
                black_box(map.remove(&k));
                black_box(map.insert(k, k));
            }
        });
    });

    group.bench_function("btreemap", |b| {
        let mut std_map: BTreeMap<u64, u64> = keys.iter().map(|&k| (k, k)).collect();
        b.iter(|| {
            for &k in &keys {
                black_box(std_map.remove(&k));
                black_box(std_map.insert(k, k));
            }
        });
    });

    group.finish();
}

// ============================================================================
// Iteration Benchmarks
// ============================================================================

fn bench_iterate(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate");
    group.throughput(Throughput::Elements(SIZE as u64));

    let keys = shuffled_keys(SIZE);
    let map: TreeMap<u64, u64> = keys.iter().map(|&k| (k, k)).collect();
    let std_map: BTreeMap<u64, u64> = keys.iter().map(|&k| (k, k)).collect();

    group.bench_function("redwood", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            for (k, _) in map.iter() {
                sum = sum.wrapping_add(*k);
            }
            black_box(sum)
        });
    });

    group.bench_function("btreemap", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            for (k, _) in std_map.iter() {
                sum = sum.wrapping_add(*k);
            }
            black_box(sum)
        });
    });

    group.finish();
}

// ============================================================================
// Multiset equal-run scan
// ============================================================================

fn bench_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("multiset_count");

    // 1000 distinct keys, 100 duplicates each.
    let mut bag: TreeMultiset<u64> = TreeMultiset::with_capacity(SIZE);
    let mut rng = SmallRng::seed_from_u64(12345);
    for _ in 0..SIZE {
        bag.insert(rng.random_range(0..1000));
    }

    group.bench_function("redwood", |b| {
        b.iter(|| {
            let mut total = 0usize;
            for k in 0..1000u64 {
                total += bag.count(&k);
            }
            black_box(total)
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_get,
    bench_churn,
    bench_iterate,
    bench_count
);
criterion_main!(benches);
