// src/kmer/abundance.rs
//! Seen-twice Bloom abundance filter.
//!
//! Singleton k-mers are overwhelmingly sequencing errors. Two filters built
//! in tandem separate them out without a count table: a k-mer's first
//! occurrence goes into `seen_once`; any occurrence already reported by
//! `seen_once` goes into `seen_twice`. The result answers "abundance ≥ 2"
//! with no false negatives, and admits a singleton only through a false
//! positive of `seen_once` (about the configured fp rate).
//!
//! The stream fans out in two stages: one producer feeds sequence lines onto
//! a bounded channel; extraction workers roll canonical k-mers and route
//! each to a shard picked by its value, so every occurrence of a k-mer
//! reaches the same shard owner. Shard owners run the once/twice cascade on
//! their own filters, and the driver folds the shard `seen_twice` filters
//! together with bitwise OR once the channels close.

use std::io;
use std::path::Path;
use std::thread;

use crossbeam::channel::{bounded, Sender};
use tracing::{debug, info};

use crate::kmer::bloom::BloomFilter;
use crate::kmer::encode::{acgt_runs, encode};
use crate::kmer::kmer::{canonical, for_each_kmer};
use crate::io::fastq::{open_fastq, stream_fastq_records};

/// Sequences queued between the reader and the extraction workers.
const QUEUE_CAPACITY: usize = 1000;

/// K-mer batches queued per shard.
const SHARD_QUEUE_CAPACITY: usize = 1000;

/// Parameters for filter construction.
#[derive(Debug, Clone)]
pub struct AbundanceConfig {
    pub k: usize,
    /// Expected distinct k-mers, for filter sizing.
    pub expected_kmers: usize,
    pub fp_rate: f64,
    pub threads: usize,
}

/// Route a k-mer to its shard; every occurrence of a value lands on the same
/// owner, which is what makes the cascade exact.
#[inline]
fn shard_of(kmer: u64, shards: usize) -> usize {
    ((kmer.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 32) as usize) % shards
}

/// Build the seen-twice filter for a FASTQ file.
pub fn seen_twice_filter(path: &Path, config: &AbundanceConfig) -> io::Result<BloomFilter> {
    let reader = open_fastq(path)?;
    let threads = config.threads.max(1);
    let k = config.k;

    info!("building seen-twice filter with {} workers", threads);
    let (seq_tx, seq_rx) = bounded::<String>(QUEUE_CAPACITY);
    let shard_channels: Vec<_> = (0..threads).map(|_| bounded::<Vec<u64>>(SHARD_QUEUE_CAPACITY)).collect();
    let shard_senders: Vec<Sender<Vec<u64>>> =
        shard_channels.iter().map(|(tx, _)| tx.clone()).collect();

    let mut merged = BloomFilter::with_fp_rate(config.expected_kmers, config.fp_rate);

    thread::scope(|scope| {
        scope.spawn(move || {
            for record in stream_fastq_records(reader) {
                if seq_tx.send(record.sequence).is_err() {
                    break;
                }
            }
            // seq_tx drops here; extraction workers see the closed channel.
        });

        for _ in 0..threads {
            let seq_rx = seq_rx.clone();
            let senders = shard_senders.clone();
            scope.spawn(move || {
                let mut batches: Vec<Vec<u64>> = vec![Vec::new(); senders.len()];
                while let Ok(sequence) = seq_rx.recv() {
                    for (_, run) in acgt_runs(sequence.as_bytes()) {
                        let encoded = encode(run);
                        for_each_kmer(&encoded, k, |kmer, _| {
                            let kc = canonical(kmer, k);
                            batches[shard_of(kc, senders.len())].push(kc);
                        });
                    }
                    for (shard, batch) in batches.iter_mut().enumerate() {
                        if !batch.is_empty() && senders[shard].send(std::mem::take(batch)).is_err() {
                            return;
                        }
                    }
                }
            });
        }
        drop(seq_rx);
        drop(shard_senders);

        let owners: Vec<_> = shard_channels
            .into_iter()
            .map(|(_, shard_rx)| {
                scope.spawn(move || {
                    let mut seen_once =
                        BloomFilter::with_fp_rate(config.expected_kmers, config.fp_rate);
                    let mut seen_twice =
                        BloomFilter::with_fp_rate(config.expected_kmers, config.fp_rate);
                    while let Ok(batch) = shard_rx.recv() {
                        for kc in batch {
                            if seen_once.may_contain(kc) {
                                seen_twice.insert(kc);
                            } else {
                                seen_once.insert(kc);
                            }
                        }
                    }
                    seen_twice
                })
            })
            .collect();

        for owner in owners {
            match owner.join() {
                Ok(seen_twice) => merged.merge(&seen_twice),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
    });

    debug!("seen_twice fill-based fp estimate: {:.2e}", merged.estimated_fp_rate());
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use crate::kmer::kmer::encode_kmer;

    fn write_fastq(dir: &tempfile::TempDir, reads: &[&str]) -> std::path::PathBuf {
        let path = dir.path().join("reads.fastq");
        let mut file = std::fs::File::create(&path).unwrap();
        for (i, read) in reads.iter().enumerate() {
            writeln!(file, "@read{}\n{}\n+\n{}", i, read, "I".repeat(read.len())).unwrap();
        }
        path
    }

    fn config(k: usize) -> AbundanceConfig {
        AbundanceConfig { k, expected_kmers: 10_000, fp_rate: 0.01, threads: 2 }
    }

    #[test]
    fn test_repeated_kmers_survive() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_fastq(&dir, &["ACGGATCCATT", "ACGGATCCATT", "TTTTTGGGGGC"]);
        let filter = seen_twice_filter(&path, &config(5)).unwrap();

        // Every 5-mer of the duplicated read has abundance >= 2.
        let read = b"ACGGATCCATT";
        for i in 0..=read.len() - 5 {
            let kmer = encode_kmer(std::str::from_utf8(&read[i..i + 5]).unwrap()).unwrap();
            assert!(filter.may_contain(canonical(kmer, 5)));
        }
    }

    #[test]
    fn test_singletons_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_fastq(&dir, &["ACGGATCCATT", "ACGGATCCATT", "CCCCCAAAAAG"]);
        let filter = seen_twice_filter(&path, &config(5)).unwrap();

        // 5-mers unique to the third read have abundance 1; with a
        // near-empty filter the false-positive budget is negligible.
        let singles = ["CCCCA", "CCCAA", "CCAAA", "CAAAA"];
        let admitted = singles
            .iter()
            .filter(|s| filter.may_contain(canonical(encode_kmer(s).unwrap(), 5)))
            .count();
        assert_eq!(admitted, 0, "unexpected singleton admissions");
    }

    #[test]
    fn test_forward_and_reverse_reads_share_buckets() {
        // GTTTT-reads are AAAAC-reads on the other strand; together they make
        // the canonical k-mer abundance 2.
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_fastq(&dir, &["AAAAC", "GTTTT"]);
        let filter = seen_twice_filter(&path, &config(5)).unwrap();
        let kc = canonical(encode_kmer("AAAAC").unwrap(), 5);
        assert!(filter.may_contain(kc));
    }

    #[test]
    fn test_within_read_repeats_count() {
        // One read repeating its own 5-mers is enough for abundance 2.
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_fastq(&dir, &["ACGTACGTACGT"]);
        let filter = seen_twice_filter(&path, &config(5)).unwrap();
        let kc = canonical(encode_kmer("ACGTA").unwrap(), 5);
        assert!(filter.may_contain(kc));
    }

    #[test]
    fn test_two_builds_agree() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_fastq(&dir, &["ACGGATCCATT", "ACGGATCCATT"]);
        let a = seen_twice_filter(&path, &config(5)).unwrap();
        let b = seen_twice_filter(&path, &config(5)).unwrap();

        for i in 0..2000u64 {
            let probe = i.wrapping_mul(0x2545_f491_4f6c_dd1d) & crate::kmer::kmer::kmer_mask(5);
            assert_eq!(a.may_contain(probe), b.may_contain(probe));
        }
    }
}
