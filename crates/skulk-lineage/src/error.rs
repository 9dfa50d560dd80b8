//! Error and Result types for Skulk lineage operations.

use crate::block::BlockId;
use thiserror::Error;

/// A convenience `Result` type for lineage operations.
pub type Result<T> = std::result::Result<T, LineageError>;

/// The error type for lineage operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LineageError {
    /// Block ID string is not a valid 26-character Crockford base32 ULID.
    #[error("Invalid block id {input:?}: {reason}")]
    InvalidBlockId {
        /// Rejected input.
        input: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Block metadata lists no source blocks.
    #[error("Block {0} has an empty source set")]
    EmptySources(BlockId),

    /// Metadata map key does not match the record it points to.
    #[error("Metadata keyed by {key} describes block {id}")]
    MismatchedId {
        /// Key in the metadata map.
        key: BlockId,
        /// ID stored in the record.
        id: BlockId,
    },

    /// Deduplication configuration is unusable.
    #[error("Invalid dedup config: {0}")]
    InvalidConfig(String),

    /// Metric could not be created or registered.
    #[error("Metrics error: {0}")]
    Metrics(String),
}
