//! Block metadata as seen by the compactor's planning pass.

pub mod id;
pub mod shard;
pub mod sources;

pub use id::BlockId;
pub use shard::{ShardDescriptor, COMPACTOR_SHARD_ID_LABEL};
pub use sources::SourceSet;

use crate::error::{LineageError, Result};
use std::collections::HashMap;

/// Downsampling resolution in milliseconds (0 = raw data).
pub type Resolution = i64;

/// Metadata snapshot for one planning cycle, keyed by block ID.
pub type BlockMetas = HashMap<BlockId, BlockRecord>;

/// Lineage-relevant metadata of a single block.
///
/// # Examples
/// ```rust,ignore
/// use alopex_skulk_lineage::{BlockId, BlockRecord};
///
/// let id = BlockId::new(1_700_000_000_000, 7);
/// let raw = BlockRecord::new(id);
/// let shard = BlockRecord::new(BlockId::new(1_700_000_100_000, 1))
///     .with_sources([id])
///     .with_shard_label("1_of_2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecord {
    /// ID of the block.
    pub id: BlockId,
    /// Original blocks this block was compacted from.
    pub sources: SourceSet,
    /// Downsampling resolution.
    pub resolution: Resolution,
    /// Shard this block holds.
    pub shard: ShardDescriptor,
}

impl BlockRecord {
    /// Creates a raw, unsharded, never-compacted block (sources = `{id}`).
    pub fn new(id: BlockId) -> Self {
        Self {
            id,
            sources: SourceSet::singleton(id),
            resolution: 0,
            shard: ShardDescriptor::Unsharded,
        }
    }

    /// Replaces the source set.
    pub fn with_sources<I: IntoIterator<Item = BlockId>>(mut self, sources: I) -> Self {
        self.sources = sources.into_iter().collect();
        self
    }

    /// Sets the downsampling resolution.
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Sets the shard descriptor.
    pub fn with_shard(mut self, shard: ShardDescriptor) -> Self {
        self.shard = shard;
        self
    }

    /// Sets the shard descriptor from its label form.
    pub fn with_shard_label(self, label: &str) -> Self {
        self.with_shard(ShardDescriptor::parse(label))
    }
}

/// Checks the invariants the deduplicator relies on.
///
/// Every record must list at least one source and be stored under its own
/// ID. Violations indicate corrupted metadata upstream and must stop the
/// planning cycle.
pub fn validate_records(records: &BlockMetas) -> Result<()> {
    for (key, record) in records {
        if *key != record.id {
            return Err(LineageError::MismatchedId {
                key: *key,
                id: record.id,
            });
        }
        if record.sources.is_empty() {
            return Err(LineageError::EmptySources(record.id));
        }
    }
    Ok(())
}
