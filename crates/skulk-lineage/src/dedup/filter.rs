//! The shard-aware deduplication pass.
//!
//! # Algorithm
//!
//! ```text
//! records ─▶ partition by resolution ─▶ (per partition, maybe in parallel)
//!              classify by source set, resolve equal-sources ties
//!              sketch every class
//!              for each class Y, for each coverer X with |X| > |Y|:
//!                  sketch(Y) ⊆ sketch(X)?  ── no ──▶ next X
//!                  Y.sources ⊆ X.sources?  ── no ──▶ next X (false positive)
//!                  Y is covered, stop
//!          ─▶ remove covered/superseded records, bump counter once
//! ```
//!
//! Equal source sets never reach the covering loop, they are resolved while
//! classifying. Only strictly larger coverers are tried, so no class can
//! cover itself and no two classes can cover each other.

use crate::block::{BlockId, BlockMetas, BlockRecord, Resolution};
use crate::dedup::class::{classify, ClassStatus, EquivalenceClass};
use crate::dedup::sketch::SourceSketch;
use crate::dedup::{DedupConfig, DedupReport};
use crate::error::Result;
use crate::metrics::SupersededCounter;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Removes blocks whose data is fully represented by other blocks.
///
/// A block is superseded when another block (or complete shard set) of the
/// same resolution was compacted from a superset of its sources, or when a
/// newer block was compacted from exactly the same sources. Blocks with
/// malformed or missing shard siblings never supersede anything.
///
/// # Examples
/// ```rust,ignore
/// use alopex_skulk_lineage::{BlockMetas, ShardAwareDeduplicator};
/// use std::sync::atomic::AtomicU64;
///
/// let dedup = ShardAwareDeduplicator::default();
/// let duplicates = AtomicU64::new(0);
/// let mut metas: BlockMetas = fetch_metas()?;
/// let removed = dedup.deduplicate(&mut metas, &duplicates);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ShardAwareDeduplicator {
    config: DedupConfig,
}

impl ShardAwareDeduplicator {
    /// Creates a deduplicator after validating the configuration.
    pub fn new(config: DedupConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Removes superseded records in place and returns their IDs, ascending.
    ///
    /// `counter` is incremented once by the number of removed records.
    pub fn deduplicate<C>(&self, records: &mut BlockMetas, counter: &C) -> Vec<BlockId>
    where
        C: SupersededCounter + ?Sized,
    {
        self.deduplicate_with_report(records, counter).removed
    }

    /// Like [`Self::deduplicate`], also returning per-pass diagnostics.
    pub fn deduplicate_with_report<C>(&self, records: &mut BlockMetas, counter: &C) -> DedupReport
    where
        C: SupersededCounter + ?Sized,
    {
        let mut partitions: BTreeMap<Resolution, Vec<&BlockRecord>> = BTreeMap::new();
        for record in records.values() {
            partitions.entry(record.resolution).or_default().push(record);
        }

        let outcomes: Vec<DedupReport> = if self.config.parallel && partitions.len() > 1 {
            partitions
                .into_par_iter()
                .map(|(resolution, members)| self.dedup_partition(resolution, members))
                .collect()
        } else {
            partitions
                .into_iter()
                .map(|(resolution, members)| self.dedup_partition(resolution, members))
                .collect()
        };

        let mut report = DedupReport::default();
        for outcome in outcomes {
            report.merge(outcome);
        }
        report.removed.sort_unstable();

        for id in &report.removed {
            records.remove(id);
        }
        counter.add(report.removed.len() as u64);

        debug!(
            partitions = report.partitions,
            classes = report.classes,
            removed = report.removed.len(),
            remaining = records.len(),
            poisoned = report.poisoned_shard_classes,
            incomplete = report.incomplete_shard_classes,
            "deduplicated block metas"
        );
        report
    }

    fn dedup_partition(&self, resolution: Resolution, members: Vec<&BlockRecord>) -> DedupReport {
        let classes = classify(members);
        let sketches: Vec<SourceSketch> = classes
            .iter()
            .map(|class| {
                SourceSketch::build(
                    class.sources,
                    self.config.sketch_bits,
                    self.config.sketch_hashes,
                )
            })
            .collect();

        // Largest source sets first, so each class only walks the prefix of
        // strictly larger coverers.
        let mut coverers: Vec<usize> = (0..classes.len())
            .filter(|&idx| classes[idx].status == ClassStatus::Coverer)
            .collect();
        coverers.sort_by(|&a, &b| {
            classes[b]
                .sources
                .len()
                .cmp(&classes[a].sources.len())
                .then_with(|| classes[a].sources.cmp(classes[b].sources))
        });

        let mut report = DedupReport {
            partitions: 1,
            classes: classes.len(),
            ..DedupReport::default()
        };

        for (idx, class) in classes.iter().enumerate() {
            match class.status {
                ClassStatus::Coverer => {}
                ClassStatus::Poisoned => report.poisoned_shard_classes += 1,
                ClassStatus::Incomplete => report.incomplete_shard_classes += 1,
            }
            report.removed.extend_from_slice(&class.superseded);

            let covered_by = find_coverer(
                idx,
                &classes,
                &sketches,
                &coverers,
                &mut report.sketch_false_positives,
            );
            if let Some(coverer) = covered_by {
                trace!(
                    resolution,
                    blocks = ?class.survivors,
                    by = ?classes[coverer].survivors,
                    "blocks covered by larger compaction"
                );
                report.removed.extend_from_slice(&class.survivors);
            }
        }

        debug!(
            resolution,
            classes = report.classes,
            removed = report.removed.len(),
            false_positives = report.sketch_false_positives,
            "deduplicated resolution"
        );
        report
    }
}

/// Returns the first coverer that strictly contains class `idx`.
fn find_coverer(
    idx: usize,
    classes: &[EquivalenceClass<'_>],
    sketches: &[SourceSketch],
    coverers: &[usize],
    false_positives: &mut usize,
) -> Option<usize> {
    let candidate = &classes[idx];
    for &coverer in coverers {
        if classes[coverer].sources.len() <= candidate.sources.len() {
            break;
        }
        if !sketches[idx].is_possibly_subset_of(&sketches[coverer]) {
            continue;
        }
        if candidate.sources.is_subset(classes[coverer].sources) {
            return Some(coverer);
        }
        *false_positives += 1;
        trace!(
            sources = candidate.sources.len(),
            coverer_sources = classes[coverer].sources.len(),
            "sketch false positive"
        );
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::SourceSet;
    use std::cell::Cell;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn id(ts: u64) -> BlockId {
        BlockId::new(ts, 0)
    }

    fn metas(records: Vec<BlockRecord>) -> BlockMetas {
        records.into_iter().map(|r| (r.id, r)).collect()
    }

    fn block(block: u64, sources: &[u64]) -> BlockRecord {
        BlockRecord::new(id(block)).with_sources(sources.iter().map(|&s| id(s)))
    }

    /// Counts calls as well as the total.
    #[derive(Default)]
    struct CallCounter {
        calls: Cell<u32>,
        total: Cell<u64>,
    }

    impl SupersededCounter for CallCounter {
        fn add(&self, count: u64) {
            self.calls.set(self.calls.get() + 1);
            self.total.set(self.total.get() + count);
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        assert!(ShardAwareDeduplicator::new(DedupConfig::default().with_sketch_bits(10)).is_err());
        assert!(ShardAwareDeduplicator::new(DedupConfig::default()).is_ok());
    }

    #[test]
    fn test_counter_incremented_once() {
        let mut records = metas(vec![
            block(1, &[1]),
            block(2, &[2]),
            block(3, &[1, 2]),
            block(4, &[1, 2]),
        ]);
        let counter = CallCounter::default();
        let removed = ShardAwareDeduplicator::default().deduplicate(&mut records, &counter);

        assert_eq!(removed, vec![id(1), id(2), id(3)]);
        assert_eq!(counter.calls.get(), 1);
        assert_eq!(counter.total.get(), 3);
    }

    #[test]
    fn test_counter_incremented_once_when_nothing_removed() {
        let mut records = metas(vec![block(1, &[1])]);
        let counter = CallCounter::default();
        let removed = ShardAwareDeduplicator::default().deduplicate(&mut records, &counter);
        assert!(removed.is_empty());
        assert_eq!(counter.calls.get(), 1);
        assert_eq!(counter.total.get(), 0);
    }

    #[test]
    fn test_empty_input() {
        let mut records = BlockMetas::new();
        let counter = AtomicU64::new(0);
        let report =
            ShardAwareDeduplicator::default().deduplicate_with_report(&mut records, &counter);
        assert_eq!(report, DedupReport::default());
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_report_counts_shard_problems() {
        let mut records = metas(vec![
            block(1, &[1]),
            block(2, &[2]),
            block(3, &[1, 2]).with_shard_label("1_of_2"),
            block(5, &[5]),
            block(6, &[5, 6]).with_shard_label("oops"),
        ]);
        let counter = AtomicU64::new(0);
        let report =
            ShardAwareDeduplicator::default().deduplicate_with_report(&mut records, &counter);

        assert!(report.removed.is_empty());
        assert_eq!(report.partitions, 1);
        assert_eq!(report.classes, 5);
        assert_eq!(report.poisoned_shard_classes, 1);
        assert_eq!(report.incomplete_shard_classes, 1);
        assert_eq!(records.len(), 5);
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let build = || {
            let mut records = Vec::new();
            for resolution in [0, 300_000, 3_600_000] {
                let base = resolution as u64;
                records.push(block(base + 1, &[1]).with_resolution(resolution));
                records.push(block(base + 2, &[2]).with_resolution(resolution));
                records.push(block(base + 3, &[1, 2]).with_resolution(resolution));
            }
            metas(records)
        };

        let mut parallel = build();
        let mut sequential = build();
        let counter = AtomicU64::new(0);
        let a = ShardAwareDeduplicator::new(DedupConfig::default().with_parallel(true))
            .unwrap()
            .deduplicate_with_report(&mut parallel, &counter);
        let b = ShardAwareDeduplicator::new(DedupConfig::default().with_parallel(false))
            .unwrap()
            .deduplicate_with_report(&mut sequential, &counter);

        assert_eq!(a, b);
        assert_eq!(a.partitions, 3);
        assert_eq!(a.removed.len(), 6);
        assert_eq!(counter.load(Ordering::Relaxed), 12);
    }

    #[test]
    fn test_tiny_sketch_still_sound() {
        // A 64-bit single-hash sketch saturates quickly; exact verification
        // must still reject overlapping but non-nested source sets.
        let mut records = Vec::new();
        for i in 0..40u64 {
            records.push(block(1_000 + i, &[i, i + 1]));
        }
        records.push(block(2_000, &(0..20).collect::<Vec<_>>()));
        let mut records = metas(records);

        let dedup = ShardAwareDeduplicator::new(
            DedupConfig::default()
                .with_sketch_bits(64)
                .with_sketch_hashes(1),
        )
        .unwrap();
        let counter = AtomicU64::new(0);
        let report = dedup.deduplicate_with_report(&mut records, &counter);

        let big: SourceSet = (0..20).map(id).collect();
        for removed in &report.removed {
            assert!(removed.timestamp_ms() >= 1_000 && removed.timestamp_ms() < 1_019);
        }
        assert_eq!(report.removed.len(), 19);
        assert!(records.values().all(|r| r.id == id(2_000) || !r.sources.is_strict_subset(&big)));
    }
}
