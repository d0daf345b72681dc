// src/kmer/minimizer.rs
//! Density-based minimizer selection and the dense ID table.
//!
//! A canonical k-mer becomes a graph node (a minimizer) when its FNV-1a hash,
//! taken as a nonnegative value, falls below `density * 2^63`. The admitted
//! fraction therefore tracks the configured density. IDs are assigned in
//! first-seen order during a dedicated discovery pass, so the table is frozen
//! and read-only by the time edges are extracted.

use ahash::AHashMap;

use crate::kmer::bloom::BloomFilter;
use crate::kmer::encode::{acgt_runs, encode};
use crate::kmer::hash::fnv1a64;
use crate::kmer::kmer::{canonical, for_each_kmer};

/// Hash-threshold admission test.
#[derive(Debug, Clone, Copy)]
pub struct MinimizerSelector {
    threshold: u64,
}

impl MinimizerSelector {
    pub fn new(density: f64) -> Self {
        let threshold = (density * (1u64 << 63) as f64) as u64;
        Self { threshold }
    }

    /// True if the canonical k-mer is admitted at this density.
    #[inline]
    pub fn admits(&self, canonical_kmer: u64) -> bool {
        (fnv1a64(canonical_kmer) & 0x7FFF_FFFF_FFFF_FFFF) < self.threshold
    }
}

/// Dense `canonical k-mer -> id` table; ids start at 0 and grow by 1 in
/// assignment order.
#[derive(Debug, Default)]
pub struct MinimizerTable {
    ids: AHashMap<u64, u32>,
}

impl MinimizerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up or assign the next dense id.
    pub fn get_or_assign(&mut self, canonical_kmer: u64) -> u32 {
        let next = self.ids.len() as u32;
        *self.ids.entry(canonical_kmer).or_insert(next)
    }

    pub fn get(&self, canonical_kmer: u64) -> Option<u32> {
        self.ids.get(&canonical_kmer).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// One admitted minimizer occurrence inside a read: the node id and the
/// 0-based raw-read index of the k-mer's first base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinimizerOccurrence {
    pub id: u32,
    pub position: usize,
}

/// Discovery pass over one read: assign ids to every abundance-filtered,
/// hash-admitted canonical k-mer, in read order.
pub fn discover_minimizers(
    read: &[u8],
    k: usize,
    seen_twice: &BloomFilter,
    selector: MinimizerSelector,
    table: &mut MinimizerTable,
) {
    for (_, run) in acgt_runs(read) {
        let encoded = encode(run);
        for_each_kmer(&encoded, k, |kmer, _| {
            let kc = canonical(kmer, k);
            if seen_twice.may_contain(kc) && selector.admits(kc) {
                table.get_or_assign(kc);
            }
        });
    }
}

/// Occurrence pass over one read, against a frozen table.
///
/// Occurrences come back grouped per ACGT run so that edge chains never span
/// a non-ACGT gap; positions are raw-read coordinates. Within a group the
/// positions strictly increase.
pub fn occurrences_in_read(
    read: &[u8],
    k: usize,
    table: &MinimizerTable,
) -> Vec<Vec<MinimizerOccurrence>> {
    let mut chains = Vec::new();
    for (offset, run) in acgt_runs(read) {
        let mut chain = Vec::new();
        let encoded = encode(run);
        for_each_kmer(&encoded, k, |kmer, pos| {
            if let Some(id) = table.get(canonical(kmer, k)) {
                chain.push(MinimizerOccurrence { id, position: offset + pos });
            }
        });
        if !chain.is_empty() {
            chains.push(chain);
        }
    }
    chains
}
