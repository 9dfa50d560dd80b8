//! Shard descriptors for horizontally split compaction output.
//!
//! The split-and-merge compactor writes every output shard with an external
//! label `__compactor_shard_id__="<index>_of_<count>"`. Blocks without the
//! label (or with an empty value) are whole, unsharded blocks.

use std::collections::BTreeMap;
use std::fmt;

/// External label key carrying a block's shard descriptor.
pub const COMPACTOR_SHARD_ID_LABEL: &str = "__compactor_shard_id__";

const SEPARATOR: &str = "_of_";

/// Which horizontal partition of a merge a block holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShardDescriptor {
    /// The block holds all series of its sources.
    #[default]
    Unsharded,
    /// The block holds shard `index` of `count` (`1 <= index <= count`).
    Sharded {
        /// 1-based shard index.
        index: u32,
        /// Total number of shards in the split.
        count: u32,
    },
    /// The label was present but malformed.
    Invalid,
}

impl ShardDescriptor {
    /// Parses a shard label.
    ///
    /// An empty label is [`ShardDescriptor::Unsharded`]. Anything other than
    /// `<index>_of_<count>` with positive decimal fields and
    /// `index <= count` is [`ShardDescriptor::Invalid`].
    ///
    /// # Examples
    /// ```rust,ignore
    /// use alopex_skulk_lineage::ShardDescriptor;
    ///
    /// assert_eq!(
    ///     ShardDescriptor::parse("2_of_4"),
    ///     ShardDescriptor::Sharded { index: 2, count: 4 }
    /// );
    /// assert_eq!(ShardDescriptor::parse("3_of_2"), ShardDescriptor::Invalid);
    /// ```
    pub fn parse(label: &str) -> Self {
        if label.is_empty() {
            return Self::Unsharded;
        }

        let Some((index, count)) = label.split_once(SEPARATOR) else {
            return Self::Invalid;
        };
        match (parse_positive(index), parse_positive(count)) {
            (Some(index), Some(count)) if index <= count => Self::Sharded { index, count },
            _ => Self::Invalid,
        }
    }

    /// Reads the descriptor from a block's external labels.
    pub fn from_labels(labels: &BTreeMap<String, String>) -> Self {
        labels
            .get(COMPACTOR_SHARD_ID_LABEL)
            .map_or(Self::Unsharded, |label| Self::parse(label))
    }

    /// Builds a sharded descriptor, or `Invalid` when the pair is out of range.
    pub fn sharded(index: u32, count: u32) -> Self {
        if index == 0 || index > count {
            Self::Invalid
        } else {
            Self::Sharded { index, count }
        }
    }

    /// Returns true for [`ShardDescriptor::Sharded`].
    pub fn is_sharded(&self) -> bool {
        matches!(self, Self::Sharded { .. })
    }

    /// Returns true for [`ShardDescriptor::Invalid`].
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid)
    }
}

impl fmt::Display for ShardDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsharded => Ok(()),
            Self::Sharded { index, count } => write!(f, "{index}{SEPARATOR}{count}"),
            Self::Invalid => f.write_str("invalid"),
        }
    }
}

fn parse_positive(field: &str) -> Option<u32> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse::<u32>().ok().filter(|&value| value > 0)
}
