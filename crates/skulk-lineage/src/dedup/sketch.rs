//! Bloom-filter sketches of source sets.
//!
//! A [`SourceSketch`] is a fixed-width bit vector where every member ID sets
//! `hashes` bits. Subset testing works bit-wise: if every bit of `a` is set in
//! `b`, then `a` may be a subset of `b`. The test has no false negatives,
//! because each member of a true subset sets exactly the same bits in both
//! sketches. False positives happen when `b` is dense enough to hide an
//! extra member of `a`, so a positive answer must always be confirmed
//! against the real sets.
//!
//! # Layout
//!
//! ```text
//! bit index i (0 <= i < hashes) = (h1 + i * h2) mod bits
//! h1 = xxh3(id, seed 0),  h2 = xxh3(id, seed 1) | 1
//! ```

use crate::block::{BlockId, SourceSet};
use bitvec::prelude::*;
use xxhash_rust::xxh3::xxh3_64_with_seed;

const H1_SEED: u64 = 0;
const H2_SEED: u64 = 1;

/// Approximate, mergeable representation of a [`SourceSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSketch {
    bits: BitVec<u64, Lsb0>,
    hashes: u32,
}

impl SourceSketch {
    /// Creates an empty sketch.
    ///
    /// `bits` should be a multiple of 64; [`crate::dedup::DedupConfig`]
    /// enforces this for sketches built by the deduplicator.
    pub fn empty(bits: usize, hashes: u32) -> Self {
        Self {
            bits: BitVec::repeat(false, bits.max(1)),
            hashes: hashes.max(1),
        }
    }

    /// Builds the sketch of a source set. The result depends only on the
    /// members, not on insertion order.
    ///
    /// # Examples
    /// ```rust,ignore
    /// use alopex_skulk_lineage::dedup::SourceSketch;
    ///
    /// let small = SourceSketch::build(&small_sources, 8192, 3);
    /// let large = SourceSketch::build(&large_sources, 8192, 3);
    /// if small.is_possibly_subset_of(&large) && small_sources.is_subset(&large_sources) {
    ///     // confirmed
    /// }
    /// ```
    pub fn build(sources: &SourceSet, bits: usize, hashes: u32) -> Self {
        let mut sketch = Self::empty(bits, hashes);
        for id in sources {
            sketch.insert(*id);
        }
        sketch
    }

    fn insert(&mut self, id: BlockId) {
        let width = self.bits.len() as u64;
        let (h1, h2) = hash_pair(id);
        for i in 0..u64::from(self.hashes) {
            let bit = h1.wrapping_add(i.wrapping_mul(h2)) % width;
            self.bits.set(bit as usize, true);
        }
    }

    /// Returns false only if `self` cannot describe a subset of `other`.
    ///
    /// Sketches of different shapes cannot be compared bit-wise, so they
    /// conservatively answer true.
    pub fn is_possibly_subset_of(&self, other: &SourceSketch) -> bool {
        if !self.same_shape(other) {
            return true;
        }
        self.bits
            .as_raw_slice()
            .iter()
            .zip(other.bits.as_raw_slice())
            .all(|(mine, theirs)| mine & !theirs == 0)
    }

    /// Returns the sketch of the union of both underlying sets.
    ///
    /// Returns `None` when the sketches differ in shape.
    pub fn union(&self, other: &SourceSketch) -> Option<SourceSketch> {
        if !self.same_shape(other) {
            return None;
        }
        let mut bits = self.bits.clone();
        for (mine, theirs) in bits
            .as_raw_mut_slice()
            .iter_mut()
            .zip(other.bits.as_raw_slice())
        {
            *mine |= *theirs;
        }
        Some(Self {
            bits,
            hashes: self.hashes,
        })
    }

    /// Width of the sketch in bits.
    pub fn width(&self) -> usize {
        self.bits.len()
    }

    /// Number of bits set.
    pub fn ones(&self) -> usize {
        self.bits.count_ones()
    }

    fn same_shape(&self, other: &SourceSketch) -> bool {
        self.bits.len() == other.bits.len() && self.hashes == other.hashes
    }
}

/// Derives two independent 64-bit hashes from the full 128-bit ID.
///
/// ULIDs minted in tests often carry zero entropy, so all 16 bytes are
/// hashed.
fn hash_pair(id: BlockId) -> (u64, u64) {
    let bytes = id.as_u128().to_be_bytes();
    let h1 = xxh3_64_with_seed(&bytes, H1_SEED);
    let h2 = xxh3_64_with_seed(&bytes, H2_SEED) | 1;
    (h1, h2)
}
