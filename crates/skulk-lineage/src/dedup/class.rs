//! Equivalence classes: blocks of one resolution sharing a source set.
//!
//! A class can stand in for its source set (cover smaller classes) only if
//! its members form one complete representation of that data:
//!
//! - unsharded members are each complete on their own;
//! - sharded members must all carry the same `count` and together use every
//!   index `1..=count` exactly once.
//!
//! A malformed label or inconsistent shard set poisons the class: nothing is
//! removed on its account. A consistent but partial shard set is incomplete
//! and is treated the same way.

use crate::block::{BlockId, BlockRecord, ShardDescriptor, SourceSet};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// Whether a class may cover other classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClassStatus {
    /// Complete and well-formed.
    Coverer,
    /// Malformed or inconsistent shard labels.
    Poisoned,
    /// Consistent shard labels, but some shards are missing.
    Incomplete,
}

#[derive(Debug)]
pub(crate) struct EquivalenceClass<'a> {
    pub(crate) sources: &'a SourceSet,
    pub(crate) status: ClassStatus,
    /// Members still standing after the equal-sources tie-break.
    pub(crate) survivors: Vec<BlockId>,
    /// Members replaced by a newer representation of the same sources.
    pub(crate) superseded: Vec<BlockId>,
}

/// Groups records (all of one resolution) by source set and resolves
/// equal-sources ties. Classes come back ordered by source set.
pub(crate) fn classify<'a, I>(records: I) -> Vec<EquivalenceClass<'a>>
where
    I: IntoIterator<Item = &'a BlockRecord>,
{
    let mut groups: HashMap<&'a SourceSet, Vec<&'a BlockRecord>> = HashMap::new();
    for record in records {
        groups.entry(&record.sources).or_default().push(record);
    }

    let mut classes: Vec<EquivalenceClass<'a>> = groups
        .into_iter()
        .map(|(sources, members)| resolve(sources, members))
        .collect();
    classes.sort_unstable_by(|a, b| a.sources.cmp(b.sources));
    classes
}

fn resolve<'a>(sources: &'a SourceSet, members: Vec<&'a BlockRecord>) -> EquivalenceClass<'a> {
    let (whole, shards): (Vec<&BlockRecord>, Vec<&BlockRecord>) = members
        .into_iter()
        .partition(|record| record.shard == ShardDescriptor::Unsharded);

    let mut whole_ids: Vec<BlockId> = whole.iter().map(|record| record.id).collect();
    whole_ids.sort_unstable();

    if shards.is_empty() {
        // Only the newest whole block is kept.
        let survivor = whole_ids.pop();
        return EquivalenceClass {
            sources,
            status: ClassStatus::Coverer,
            survivors: survivor.into_iter().collect(),
            superseded: whole_ids,
        };
    }

    let mut shard_ids: Vec<BlockId> = shards.iter().map(|record| record.id).collect();
    shard_ids.sort_unstable();

    let status = shard_set_status(&shards);
    match status {
        ClassStatus::Coverer => {}
        ClassStatus::Poisoned => {
            warn!(
                sources = sources.len(),
                blocks = ?shard_ids,
                "inconsistent shard labels, blocks cannot replace their sources"
            );
        }
        ClassStatus::Incomplete => {
            debug!(
                sources = sources.len(),
                blocks = ?shard_ids,
                "incomplete shard set, blocks cannot replace their sources"
            );
        }
    }

    if status != ClassStatus::Coverer {
        let mut survivors = whole_ids;
        survivors.extend(shard_ids);
        survivors.sort_unstable();
        return EquivalenceClass {
            sources,
            status,
            survivors,
            superseded: Vec::new(),
        };
    }

    // Whole blocks and a complete shard set both represent the sources;
    // whichever side holds the newest block wins.
    let newest_whole = whole_ids.last().copied();
    let newest_shard = shard_ids.last().copied();
    let (survivors, superseded) = if newest_whole > newest_shard {
        let survivor = whole_ids.pop();
        whole_ids.extend(shard_ids);
        (survivor.into_iter().collect(), whole_ids)
    } else {
        (shard_ids, whole_ids)
    };

    EquivalenceClass {
        sources,
        status,
        survivors,
        superseded,
    }
}

fn shard_set_status(shards: &[&BlockRecord]) -> ClassStatus {
    let mut expected_count = None;
    let mut seen = BTreeSet::new();

    for record in shards {
        let ShardDescriptor::Sharded { index, count } = record.shard else {
            return ClassStatus::Poisoned;
        };
        if *expected_count.get_or_insert(count) != count {
            return ClassStatus::Poisoned;
        }
        if !seen.insert(index) {
            return ClassStatus::Poisoned;
        }
    }

    match expected_count {
        Some(count) if seen.len() == count as usize => ClassStatus::Coverer,
        _ => ClassStatus::Incomplete,
    }
}
