mod cli_main;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::FmtSubscriber;

use cli_main::{Cli, Commands};
use talon::io::filter::{filter_fastq, load_read_names};
use talon::pipeline::build::{build, Config};

fn main() -> ExitCode {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting tracing default failed");

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {}", error);
            if error.kind() == io::ErrorKind::InvalidInput {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> io::Result<()> {
    match cli.command {
        Commands::Assemble {
            input,
            output,
            work_dir,
            k,
            density,
            threads,
            expected_kmers,
            fp_rate,
            sort_buffer,
            filter_names,
            pop_bubbles,
        } => {
            let mut config = Config::new(input, output, work_dir);
            config.k = k;
            config.density = density;
            config.threads = threads;
            config.expected_kmers = expected_kmers;
            config.fp_rate = fp_rate;
            config.sort_buffer_bytes = sort_buffer;
            config.read_name_filter = filter_names;
            config.pop_bubbles = pop_bubbles;

            let report = build(&config)?;
            println!(
                "{} reads -> {} minimizers, {} edges, {} unitigs",
                report.reads, report.minimizers, report.edges, report.unitigs
            );
            Ok(())
        }

        Commands::Filter { input, output, names } => {
            let names = load_read_names(&names)?;
            let (total, written) = filter_fastq(&input, &output, &names)?;
            println!("{} records in, {} kept", total, written);
            Ok(())
        }
    }
}
