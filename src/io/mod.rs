//! FASTQ/FASTA I/O and read-name filtering.

pub mod fasta;
pub mod fastq;
pub mod filter;
