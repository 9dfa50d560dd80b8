//! Counters reported by the deduplication pass.
//!
//! The pass reports through [`SupersededCounter`], which is implemented for
//! prometheus counters and for a plain [`AtomicU64`]. The synced-blocks
//! metric is an [`IntCounterVec`] keyed by sync state; the deduplicator only
//! ever touches its [`DUPLICATE_STATE`] child.

use crate::error::{LineageError, Result};
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};
use std::sync::atomic::{AtomicU64, Ordering};

/// Name of the synced-blocks metric.
pub const SYNCED_BLOCKS_METRIC: &str = "skulk_compactor_synced_blocks";

/// Label distinguishing sync states on the synced-blocks metric.
pub const STATE_LABEL: &str = "state";

/// Sync state label for blocks dropped as duplicates.
pub const DUPLICATE_STATE: &str = "duplicate";

/// Sink for the number of superseded blocks.
///
/// The deduplicator calls [`SupersededCounter::add`] exactly once per pass,
/// with the total number of removed records.
pub trait SupersededCounter {
    /// Adds `count` removed blocks.
    fn add(&self, count: u64);
}

impl SupersededCounter for AtomicU64 {
    fn add(&self, count: u64) {
        self.fetch_add(count, Ordering::Relaxed);
    }
}

impl SupersededCounter for IntCounter {
    fn add(&self, count: u64) {
        self.inc_by(count);
    }
}

/// Counts into the `state="duplicate"` child.
impl SupersededCounter for IntCounterVec {
    fn add(&self, count: u64) {
        self.with_label_values(&[DUPLICATE_STATE]).inc_by(count);
    }
}

/// Creates the synced-blocks counter and registers it with `registry`.
///
/// # Examples
/// ```rust,ignore
/// use alopex_skulk_lineage::metrics::{synced_blocks_counter, DUPLICATE_STATE};
/// use prometheus::Registry;
///
/// let registry = Registry::new();
/// let synced = synced_blocks_counter(&registry)?;
/// dedup.deduplicate(&mut metas, &synced);
/// let duplicates = synced.with_label_values(&[DUPLICATE_STATE]).get();
/// ```
pub fn synced_blocks_counter(registry: &Registry) -> Result<IntCounterVec> {
    let counter = IntCounterVec::new(
        Opts::new(
            SYNCED_BLOCKS_METRIC,
            "Number of blocks synced from object storage, by state",
        ),
        &[STATE_LABEL],
    )
    .map_err(|err| LineageError::Metrics(err.to_string()))?;
    registry
        .register(Box::new(counter.clone()))
        .map_err(|err| LineageError::Metrics(err.to_string()))?;
    Ok(counter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_counter() {
        let counter = AtomicU64::new(2);
        counter.add(3);
        assert_eq!(counter.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn test_int_counter() {
        let counter = IntCounter::new("superseded_blocks", "superseded blocks").unwrap();
        counter.add(4);
        counter.add(0);
        assert_eq!(counter.get(), 4);
    }

    #[test]
    fn test_synced_counter_only_touches_duplicate_state() {
        let registry = Registry::new();
        let synced = synced_blocks_counter(&registry).unwrap();
        synced.with_label_values(&["marked-for-deletion"]).inc();

        synced.add(2);
        synced.add(0);

        assert_eq!(synced.with_label_values(&[DUPLICATE_STATE]).get(), 2);
        assert_eq!(synced.with_label_values(&["marked-for-deletion"]).get(), 1);

        let families = registry.gather();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].get_name(), SYNCED_BLOCKS_METRIC);
        assert_eq!(families[0].get_metric().len(), 2);
    }

    #[test]
    fn test_synced_counter_registers_once() {
        let registry = Registry::new();
        synced_blocks_counter(&registry).unwrap();
        let err = synced_blocks_counter(&registry).unwrap_err();
        assert!(matches!(err, LineageError::Metrics(_)));
    }
}
