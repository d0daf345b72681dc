use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "talon", version, about = "Minimizer de Bruijn graph assembler", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assemble FASTQ reads into FASTA contigs
    Assemble {
        /// Input FASTQ(.gz) file
        #[arg(short, long)]
        input: PathBuf,

        /// Output FASTA file
        #[arg(short, long)]
        output: PathBuf,

        /// Directory for intermediate edge files and sort scratch
        #[arg(short, long)]
        work_dir: PathBuf,

        /// K-mer length (max 31)
        #[arg(short, long, default_value_t = 21)]
        k: usize,

        /// Minimizer density: fraction of canonical k-mers admitted as nodes
        #[arg(short, long, default_value_t = 0.005)]
        density: f64,

        /// Number of worker threads for the Bloom passes
        #[arg(long, default_value_t = num_cpus::get())]
        threads: usize,

        /// Expected distinct k-mers, for Bloom filter sizing
        #[arg(long, default_value_t = 100_000_000)]
        expected_kmers: usize,

        /// Bloom filter false positive rate
        #[arg(long, default_value_t = 0.01)]
        fp_rate: f64,

        /// Byte budget for in-memory sort buffers
        #[arg(long, default_value_t = 256 * 1024 * 1024)]
        sort_buffer: usize,

        /// File of read names to drop before assembly (one per line)
        #[arg(long)]
        filter_names: Option<PathBuf>,

        /// Collapse bubbles to their lexicographically smallest side
        #[arg(long)]
        pop_bubbles: bool,
    },

    /// Remove named reads from a FASTQ file
    Filter {
        /// Input FASTQ(.gz) file
        #[arg(short, long)]
        input: PathBuf,

        /// Output FASTQ(.gz) file
        #[arg(short, long)]
        output: PathBuf,

        /// File of read names to remove (one per line)
        #[arg(short, long)]
        names: PathBuf,
    },
}
