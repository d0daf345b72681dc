// src/kmer/bloom.rs
//! Bloom filter over integer k-mers.
//!
//! False positives are possible but false negatives are not, which is exactly
//! the contract the seen-twice abundance filter needs: every k-mer observed
//! at least twice must survive, and a bounded fraction of singletons slipping
//! through is acceptable.
//!
//! Hashing uses a fixed-seed [`ahash::RandomState`] so two builds over the
//! same input produce filters with identical membership, and filters built on
//! different worker threads can be merged by bitwise OR.

use ahash::RandomState;

const SEED: (u64, u64, u64, u64) = (
    0x517c_c1b7_2722_0a95,
    0x6c62_272e_07bb_0142,
    0x2f52_8dcc_81c9_5fda,
    0x9e37_79b9_7f4a_7c15,
);

/// A space-efficient probabilistic membership set for `u64` k-mers.
pub struct BloomFilter {
    bits: Vec<u64>,
    num_bits: usize,
    num_hashes: usize,
    state: RandomState,
}

impl BloomFilter {
    /// Create a filter sized for `expected_items` at the given false positive
    /// rate, using the standard optimal-parameter formulas.
    ///
    /// # Arguments
    /// * `expected_items` - Expected number of distinct k-mers
    /// * `fp_rate` - Desired false positive rate (e.g., 0.01 for 1%)
    pub fn with_fp_rate(expected_items: usize, fp_rate: f64) -> Self {
        let ln2_sq = std::f64::consts::LN_2 * std::f64::consts::LN_2;
        let num_bits = (-(expected_items as f64) * fp_rate.ln() / ln2_sq).ceil() as usize;
        let num_hashes =
            ((num_bits as f64 / expected_items as f64) * std::f64::consts::LN_2).ceil() as usize;
        Self::new(num_bits, num_hashes)
    }

    /// Create a filter with explicit size parameters.
    pub fn new(num_bits: usize, num_hashes: usize) -> Self {
        // Round up to a whole number of u64 words.
        let num_bits = ((num_bits + 63) / 64) * 64;
        Self {
            bits: vec![0u64; num_bits / 64],
            num_bits,
            num_hashes: num_hashes.max(1),
            state: RandomState::with_seeds(SEED.0, SEED.1, SEED.2, SEED.3),
        }
    }

    /// Insert a k-mer. `may_contain` will return true for it afterwards.
    #[inline]
    pub fn insert(&mut self, kmer: u64) {
        let hash = self.state.hash_one(kmer);
        for i in 0..self.num_hashes {
            let bit = self.bit_index(hash, i);
            self.bits[bit / 64] |= 1u64 << (bit % 64);
        }
    }

    /// True if the k-mer might be present; false means definitely absent.
    #[inline]
    pub fn may_contain(&self, kmer: u64) -> bool {
        let hash = self.state.hash_one(kmer);
        for i in 0..self.num_hashes {
            let bit = self.bit_index(hash, i);
            if self.bits[bit / 64] & (1u64 << (bit % 64)) == 0 {
                return false;
            }
        }
        true
    }

    /// Bit index for hash function `i`, by double hashing:
    /// `h(i) = h1 + i * h2 mod m`.
    #[inline]
    fn bit_index(&self, hash: u64, i: usize) -> usize {
        let h1 = hash as u32 as u64;
        let h2 = (hash >> 32) as u32 as u64;
        (h1.wrapping_add((i as u64).wrapping_mul(h2)) as usize) % self.num_bits
    }

    /// Merge another filter into this one by bitwise OR.
    ///
    /// Both filters must have been built with the same parameters; worker
    /// filters all come from one `with_fp_rate` call site, so a mismatch is
    /// an internal invariant violation.
    pub fn merge(&mut self, other: &BloomFilter) {
        assert_eq!(self.num_bits, other.num_bits, "bloom size mismatch");
        assert_eq!(self.num_hashes, other.num_hashes, "bloom hash-count mismatch");
        for (a, b) in self.bits.iter_mut().zip(other.bits.iter()) {
            *a |= *b;
        }
    }

    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    pub fn memory_bytes(&self) -> usize {
        self.bits.len() * 8
    }

    /// Estimate the current false positive rate from the fill ratio.
    pub fn estimated_fp_rate(&self) -> f64 {
        let set: usize = self.bits.iter().map(|w| w.count_ones() as usize).sum();
        let fill = set as f64 / self.num_bits as f64;
        fill.powi(self.num_hashes as i32)
    }
}
