//! Skulk Lineage - block deduplication for the Alopex Skulk compactor
//!
//! Every compacted block records the original blocks it was built from. Over
//! time the same raw data ends up in several blocks at different compaction
//! levels and shard splits. This crate decides which of those blocks are
//! superseded, so the planner only sees the most complete representation.
//!
//! # Components
//!
//! - [`BlockId`] / [`SourceSet`] / [`BlockRecord`]: lineage model
//! - [`ShardDescriptor`]: `<index>_of_<count>` shard labels
//! - [`SourceSketch`]: bloom-filter pre-check for subset tests
//! - [`ShardAwareDeduplicator`]: the deduplication pass
//!
//! # Example
//!
//! ```rust,ignore
//! use alopex_skulk_lineage::{synced_blocks_counter, validate_records, ShardAwareDeduplicator};
//!
//! let synced = synced_blocks_counter(prometheus::default_registry())?;
//! let dedup = ShardAwareDeduplicator::default();
//!
//! // One snapshot per planning cycle
//! let mut metas = fetch_block_metas()?;
//! validate_records(&metas)?;
//! let removed = dedup.deduplicate(&mut metas, &synced);
//! ```

#![deny(missing_docs)]

pub mod block;
pub mod dedup;
pub mod error;
pub mod metrics;

pub use block::{
    validate_records, BlockId, BlockMetas, BlockRecord, Resolution, ShardDescriptor, SourceSet,
    COMPACTOR_SHARD_ID_LABEL,
};
pub use dedup::{DedupConfig, DedupReport, ShardAwareDeduplicator, SourceSketch};
pub use error::{LineageError, Result};
pub use metrics::{synced_blocks_counter, SupersededCounter, DUPLICATE_STATE};
