// src/kmer/hash.rs
//! FNV-1a over the 8 bytes of a k-mer word. Used only for minimizer
//! admission; the Bloom filter hashes independently.

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a of an integer k-mer, processing its bytes from
/// most-significant to least-significant.
#[inline]
pub fn fnv1a64(kmer: u64) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for i in (0..8).rev() {
        let byte = (kmer >> (i * 8)) & 0xFF;
        hash ^= byte;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
