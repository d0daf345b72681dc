// src/io/filter.rs
//! Read-name filtering: drop FASTQ records whose name appears in a supplied
//! set, typically reads an upstream aligner already placed on a reference.
//! Producing that set is the aligner's business; this side only consumes it.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use ahash::AHashSet;
use tracing::info;

use crate::io::fastq::{open_fastq, stream_fastq_records, FastqWriter};

/// Load a read-name set from a text file: first whitespace token per line,
/// blank lines skipped.
pub fn load_read_names(path: &Path) -> io::Result<AHashSet<String>> {
    let reader = BufReader::new(File::open(path)?);
    let mut names = AHashSet::new();
    for line in reader.lines() {
        let line = line?;
        if let Some(name) = line.split_whitespace().next() {
            names.insert(name.to_string());
        }
    }
    Ok(names)
}

/// Copy every record whose name is NOT in `names_to_remove`.
///
/// Returns `(total, written)` record counts.
pub fn filter_fastq(
    input: &Path,
    output: &Path,
    names_to_remove: &AHashSet<String>,
) -> io::Result<(u64, u64)> {
    let reader = open_fastq(input)?;
    let mut writer = FastqWriter::create(output)?;

    let mut total = 0u64;
    let mut written = 0u64;
    for record in stream_fastq_records(reader) {
        total += 1;
        if !names_to_remove.contains(record.name()) {
            writer.write_record(&record)?;
            written += 1;
        }
    }
    writer.finish()?;

    info!(
        "filtered FASTQ: {} records in, {} kept, {} removed",
        total,
        written,
        total - written
    );
    Ok((total, written))
}
