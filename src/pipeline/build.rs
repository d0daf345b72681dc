// src/pipeline/build.rs
//! The assembly driver: reads in, contigs out.
//!
//! Stage order: optional read-name filtering, the seen-twice Bloom abundance
//! filter, minimizer discovery (pass 1), edge extraction against the frozen
//! ID table (pass 2), external sort of the edge file, and streaming unitig
//! assembly. All configuration travels in [`Config`]; nothing is
//! process-global.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Instant;

use tracing::info;

use crate::graph::edge::edge_file_collector;
use crate::graph::unitig::UnitigAssembler;
use crate::io::fasta::FastaWriter;
use crate::io::fastq::{open_fastq, stream_fastq_records};
use crate::io::filter::{filter_fastq, load_read_names};
use crate::kmer::abundance::{seen_twice_filter, AbundanceConfig};
use crate::kmer::kmer::MAX_K;
use crate::kmer::minimizer::{
    discover_minimizers, occurrences_in_read, MinimizerSelector, MinimizerTable,
};
use crate::sort::external::sort_edge_file;

/// Everything the build needs, with defaults matching the production run.
#[derive(Debug, Clone)]
pub struct Config {
    pub input: PathBuf,
    pub output: PathBuf,
    pub work_dir: PathBuf,
    /// K-mer length, 1..=31.
    pub k: usize,
    /// Minimizer density: admitted fraction of canonical k-mers.
    pub density: f64,
    pub threads: usize,
    /// Expected distinct k-mers, for Bloom sizing.
    pub expected_kmers: usize,
    pub fp_rate: f64,
    /// In-memory buffer budget for the external sort.
    pub sort_buffer_bytes: usize,
    /// Optional file of read names to drop before assembly.
    pub read_name_filter: Option<PathBuf>,
    pub pop_bubbles: bool,
}

impl Config {
    pub fn new(input: PathBuf, output: PathBuf, work_dir: PathBuf) -> Self {
        Self {
            input,
            output,
            work_dir,
            k: 21,
            density: 0.005,
            threads: num_cpus::get(),
            expected_kmers: 100_000_000,
            fp_rate: 0.01,
            sort_buffer_bytes: 256 * 1024 * 1024,
            read_name_filter: None,
            pop_bubbles: false,
        }
    }

    /// Fail fast on parameters the pipeline cannot run with.
    pub fn validate(&self) -> io::Result<()> {
        if self.k == 0 || self.k > MAX_K {
            return Err(invalid(format!("k must be in 1..={}, got {}", MAX_K, self.k)));
        }
        if !(self.density > 0.0 && self.density <= 1.0) {
            return Err(invalid(format!("density must be in (0, 1], got {}", self.density)));
        }
        if !(self.fp_rate > 0.0 && self.fp_rate < 1.0) {
            return Err(invalid(format!("fp_rate must be in (0, 1), got {}", self.fp_rate)));
        }
        if !self.input.is_file() {
            return Err(invalid(format!("input FASTQ not found: {}", self.input.display())));
        }
        if let Some(path) = &self.read_name_filter {
            if !path.is_file() {
                return Err(invalid(format!("read-name filter not found: {}", path.display())));
            }
        }
        Ok(())
    }
}

fn invalid(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, message)
}

/// Counts reported back to the caller after a successful build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildReport {
    pub reads: u64,
    pub minimizers: usize,
    pub edges: u64,
    pub unitigs: usize,
}

/// Run the whole pipeline. Intermediates live under `config.work_dir` and
/// are removed on success; on error they stay behind for post-mortem.
pub fn build(config: &Config) -> io::Result<BuildReport> {
    config.validate()?;
    fs::create_dir_all(&config.work_dir)?;
    let started = Instant::now();

    let source = prepare_source(config)?;

    let abundance = AbundanceConfig {
        k: config.k,
        expected_kmers: config.expected_kmers,
        fp_rate: config.fp_rate,
        threads: config.threads,
    };
    let seen_twice = seen_twice_filter(&source, &abundance)?;

    info!("minimizer discovery at density {}", config.density);
    let selector = MinimizerSelector::new(config.density);
    let mut table = MinimizerTable::new();
    let mut reads = 0u64;
    for record in stream_fastq_records(open_fastq(&source)?) {
        reads += 1;
        let sequence = record.sequence.to_ascii_uppercase();
        discover_minimizers(sequence.as_bytes(), config.k, &seen_twice, selector, &mut table);
    }
    info!("{} reads, {} minimizer nodes", reads, table.len());
    drop(seen_twice);

    let unsorted_path = config.work_dir.join("edges_unsorted.tmp");
    let sorted_path = config.work_dir.join("edges_sorted.tmp");

    info!("extracting edges");
    let mut collector = edge_file_collector(&unsorted_path)?;
    for record in stream_fastq_records(open_fastq(&source)?) {
        let sequence = record.sequence.to_ascii_uppercase();
        for chain in occurrences_in_read(sequence.as_bytes(), config.k, &table) {
            collector.add_chain(&sequence, &chain, config.k)?;
        }
    }
    let edges = collector.edge_count() as u64;
    let degrees = collector.finish()?;
    info!("{} distinct edges across {} nodes", edges, degrees.node_count());

    sort_edge_file(&config.work_dir, &unsorted_path, &sorted_path, config.sort_buffer_bytes)?;

    let assembler = UnitigAssembler::from_sorted_file(&sorted_path, config.k, config.pop_bubbles)?;
    let unitigs = assembler.assemble(&degrees);

    let mut writer = FastaWriter::create(&config.output)?;
    for (index, unitig) in unitigs.iter().enumerate() {
        writer.write_unitig(index, unitig)?;
    }
    writer.finish()?;

    fs::remove_file(&unsorted_path)?;
    fs::remove_file(&sorted_path)?;
    if source != config.input {
        fs::remove_file(&source)?;
    }

    info!(
        "assembly finished in {:.2}s: {} unitigs -> {}",
        started.elapsed().as_secs_f64(),
        unitigs.len(),
        config.output.display()
    );
    Ok(BuildReport { reads, minimizers: table.len(), edges, unitigs: unitigs.len() })
}

/// Apply the optional read-name filter, returning the FASTQ the rest of the
/// pipeline should consume.
fn prepare_source(config: &Config) -> io::Result<PathBuf> {
    let Some(names_path) = &config.read_name_filter else {
        return Ok(config.input.clone());
    };
    let names = load_read_names(names_path)?;
    info!("{} read names to remove", names.len());

    let filtered = config.work_dir.join("filtered.fastq");
    filter_fastq(&config.input, &filtered, &names)?;
    Ok(filtered)
}
