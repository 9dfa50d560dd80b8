//! Compaction lineage of a block.

use crate::block::BlockId;
use std::cmp::Ordering;

/// The set of original (never compacted) blocks a block was built from.
///
/// Members are kept sorted and deduplicated, so two sets listing the same
/// IDs in a different order compare and hash equal.
///
/// # Examples
/// ```rust,ignore
/// use alopex_skulk_lineage::{BlockId, SourceSet};
///
/// let a = BlockId::new(1, 0);
/// let b = BlockId::new(2, 0);
/// let merged: SourceSet = [b, a].into_iter().collect();
/// assert!(SourceSet::singleton(a).is_subset(&merged));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SourceSet {
    ids: Vec<BlockId>,
}

impl SourceSet {
    /// Source set of a freshly written block: just itself.
    pub fn singleton(id: BlockId) -> Self {
        Self { ids: vec![id] }
    }

    /// Number of distinct sources.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if the set has no members.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns true if `id` is a member.
    pub fn contains(&self, id: &BlockId) -> bool {
        self.ids.binary_search(id).is_ok()
    }

    /// Iterates members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &BlockId> + '_ {
        self.ids.iter()
    }

    /// Exact subset test (`self ⊆ other`), linear in the size of both sets.
    pub fn is_subset(&self, other: &SourceSet) -> bool {
        if self.ids.len() > other.ids.len() {
            return false;
        }

        let mut theirs = other.ids.iter();
        'outer: for mine in &self.ids {
            for candidate in theirs.by_ref() {
                match candidate.cmp(mine) {
                    Ordering::Less => continue,
                    Ordering::Equal => continue 'outer,
                    Ordering::Greater => return false,
                }
            }
            return false;
        }
        true
    }

    /// Exact strict subset test (`self ⊂ other`).
    pub fn is_strict_subset(&self, other: &SourceSet) -> bool {
        self.ids.len() < other.ids.len() && self.is_subset(other)
    }
}

impl FromIterator<BlockId> for SourceSet {
    fn from_iter<I: IntoIterator<Item = BlockId>>(iter: I) -> Self {
        let mut ids: Vec<BlockId> = iter.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        Self { ids }
    }
}

impl<'a> IntoIterator for &'a SourceSet {
    type Item = &'a BlockId;
    type IntoIter = std::slice::Iter<'a, BlockId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}
