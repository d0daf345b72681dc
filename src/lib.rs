//! Talon: a long-read contig assembler built on a minimizer de Bruijn graph.
//!
//! Reads come in as FASTQ, optionally pre-filtered by read name; singleton
//! k-mers are suppressed with a two-pass Bloom abundance filter; a sparse,
//! deterministic subset of canonical k-mers (minimizers) becomes the graph
//! nodes; read substrings between consecutive minimizers become edges,
//! sorted externally and walked into unitigs; contigs leave as FASTA.

pub mod graph;
pub mod io;
pub mod kmer;
pub mod pipeline;
pub mod sort;
