//! Shard-aware deduplication of block metadata.
//!
//! Before planning, the compactor drops every block whose data is already
//! fully contained in another block (or complete shard set) of the same
//! resolution. See [`ShardAwareDeduplicator`] for the algorithm.

mod class;
pub mod filter;
pub mod sketch;

pub use filter::ShardAwareDeduplicator;
pub use sketch::SourceSketch;

use crate::block::BlockId;
use crate::error::{LineageError, Result};

/// Default sketch width in bits (1 KiB per sketch).
pub const DEFAULT_SKETCH_BITS: usize = 8192;

/// Default number of bits set per source ID.
pub const DEFAULT_SKETCH_HASHES: u32 = 3;

/// Upper bound on bits set per source ID.
pub const MAX_SKETCH_HASHES: u32 = 16;

/// Configuration for the deduplicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupConfig {
    /// Width of every source-set sketch, in bits.
    ///
    /// Must be a non-zero multiple of 64. Wider sketches cut false positives
    /// for blocks with thousands of sources. Default: 8192.
    pub sketch_bits: usize,

    /// Bits set per source ID. Default: 3.
    pub sketch_hashes: u32,

    /// Process resolutions concurrently. Default: true.
    pub parallel: bool,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            sketch_bits: DEFAULT_SKETCH_BITS,
            sketch_hashes: DEFAULT_SKETCH_HASHES,
            parallel: true,
        }
    }
}

impl DedupConfig {
    /// Sets the sketch width.
    pub fn with_sketch_bits(mut self, bits: usize) -> Self {
        self.sketch_bits = bits;
        self
    }

    /// Sets the number of bits per source ID.
    pub fn with_sketch_hashes(mut self, hashes: u32) -> Self {
        self.sketch_hashes = hashes;
        self
    }

    /// Enables or disables per-resolution parallelism.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Checks the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.sketch_bits == 0 || self.sketch_bits % 64 != 0 {
            return Err(LineageError::InvalidConfig(format!(
                "sketch_bits must be a non-zero multiple of 64, got {}",
                self.sketch_bits
            )));
        }
        if self.sketch_hashes == 0 || self.sketch_hashes > MAX_SKETCH_HASHES {
            return Err(LineageError::InvalidConfig(format!(
                "sketch_hashes must be in 1..={MAX_SKETCH_HASHES}, got {}",
                self.sketch_hashes
            )));
        }
        Ok(())
    }
}

/// Outcome of one deduplication pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupReport {
    /// Removed block IDs, ascending.
    pub removed: Vec<BlockId>,
    /// Number of distinct resolutions seen.
    pub partitions: usize,
    /// Number of equivalence classes across all resolutions.
    pub classes: usize,
    /// Classes disqualified by malformed or inconsistent shard labels.
    pub poisoned_shard_classes: usize,
    /// Classes disqualified by missing shards.
    pub incomplete_shard_classes: usize,
    /// Sketch matches rejected by the exact subset check.
    pub sketch_false_positives: usize,
}

impl DedupReport {
    fn merge(&mut self, other: DedupReport) {
        self.removed.extend(other.removed);
        self.partitions += other.partitions;
        self.classes += other.classes;
        self.poisoned_shard_classes += other.poisoned_shard_classes;
        self.incomplete_shard_classes += other.incomplete_shard_classes;
        self.sketch_false_positives += other.sketch_false_positives;
    }
}
