//! Benchmarks for the shard-aware deduplicator.
//!
//! Run with: cargo bench --package alopex-skulk-lineage
//!
//! ## Benchmark Categories
//!
//! - **Unique blocks**: N blocks, each with 100 unique sources (worst case,
//!   nothing is removed, every pair is rejected by the sketch)
//! - **Three resolutions**: the same shape repeated over three resolutions
//! - **Sketch**: build and subset-test cost

use alopex_skulk_lineage::{
    BlockId, BlockMetas, BlockRecord, DedupConfig, Resolution, ShardAwareDeduplicator, SourceSet,
    SourceSketch,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::atomic::AtomicU64;

const SOURCES_PER_BLOCK: u64 = 100;

/// Generate `count` blocks per resolution, all with distinct IDs and sources.
fn generate_unique_blocks(count: u64, resolutions: &[Resolution]) -> BlockMetas {
    let mut next = 0u64;
    let mut metas = BlockMetas::new();
    for _ in 0..count {
        for &resolution in resolutions {
            let id = BlockId::new(next, 0);
            next += 1;
            let sources: Vec<BlockId> = (0..SOURCES_PER_BLOCK)
                .map(|j| BlockId::new(next + j, 0))
                .collect();
            next += SOURCES_PER_BLOCK;
            metas.insert(
                id,
                BlockRecord::new(id)
                    .with_sources(sources)
                    .with_resolution(resolution),
            );
        }
    }
    metas
}

fn bench_unique_blocks(c: &mut Criterion) {
    let mut group = c.benchmark_group("dedup_unique_blocks");
    let dedup = ShardAwareDeduplicator::default();

    for count in [10u64, 100, 1_000, 10_000] {
        let metas = generate_unique_blocks(count, &[0]);
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(BenchmarkId::from_parameter(count), &metas, |b, metas| {
            b.iter_batched(
                || metas.clone(),
                |mut metas| {
                    let removed = dedup.deduplicate(&mut metas, &AtomicU64::new(0));
                    assert!(removed.is_empty());
                    black_box(metas)
                },
                criterion::BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

fn bench_three_resolutions(c: &mut Criterion) {
    let mut group = c.benchmark_group("dedup_three_resolutions");
    let resolutions: [Resolution; 3] = [0, 5 * 60 * 1000, 60 * 60 * 1000];

    for parallel in [false, true] {
        let dedup =
            ShardAwareDeduplicator::new(DedupConfig::default().with_parallel(parallel)).unwrap();
        for count in [100u64, 1_000] {
            let metas = generate_unique_blocks(count, &resolutions);
            let name = if parallel { "parallel" } else { "sequential" };
            group.throughput(Throughput::Elements(count * resolutions.len() as u64));
            group.bench_with_input(BenchmarkId::new(name, count), &metas, |b, metas| {
                b.iter_batched(
                    || metas.clone(),
                    |mut metas| {
                        dedup.deduplicate(&mut metas, &AtomicU64::new(0));
                        black_box(metas)
                    },
                    criterion::BatchSize::LargeInput,
                )
            });
        }
    }

    group.finish();
}

fn bench_sketch(c: &mut Criterion) {
    let small: SourceSet = (0..100).map(|i| BlockId::new(i, 0)).collect();
    let large: SourceSet = (0..2_000).map(|i| BlockId::new(i, 0)).collect();
    let config = DedupConfig::default();

    c.bench_function("sketch_build_2k_sources", |b| {
        b.iter(|| SourceSketch::build(black_box(&large), config.sketch_bits, config.sketch_hashes))
    });

    let small_sketch = SourceSketch::build(&small, config.sketch_bits, config.sketch_hashes);
    let large_sketch = SourceSketch::build(&large, config.sketch_bits, config.sketch_hashes);
    c.bench_function("sketch_subset_test", |b| {
        b.iter(|| black_box(&small_sketch).is_possibly_subset_of(black_box(&large_sketch)))
    });
    c.bench_function("exact_subset_test_2k", |b| {
        b.iter(|| black_box(&small).is_subset(black_box(&large)))
    });
}

criterion_group!(
    benches,
    bench_unique_blocks,
    bench_three_resolutions,
    bench_sketch
);
criterion_main!(benches);
