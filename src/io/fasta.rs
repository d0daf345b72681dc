// src/io/fasta.rs
//! FASTA output for assembled unitigs.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

const LINE_WIDTH: usize = 80;

/// Writes unitig records `>unitig_<i> length_<len>` with 80-column wrapping,
/// to plain or gzip output by extension.
pub enum FastaWriter {
    Plain(BufWriter<File>),
    Compressed(BufWriter<GzEncoder<File>>),
}

impl FastaWriter {
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        if path.extension().is_some_and(|ext| ext == "gz") {
            let encoder = GzEncoder::new(file, Compression::default());
            Ok(FastaWriter::Compressed(BufWriter::new(encoder)))
        } else {
            Ok(FastaWriter::Plain(BufWriter::new(file)))
        }
    }

    pub fn write_unitig(&mut self, index: usize, sequence: &str) -> io::Result<()> {
        match self {
            FastaWriter::Plain(writer) => write_unitig(writer, index, sequence),
            FastaWriter::Compressed(writer) => write_unitig(writer, index, sequence),
        }
    }

    pub fn finish(self) -> io::Result<()> {
        match self {
            FastaWriter::Plain(mut writer) => writer.flush(),
            FastaWriter::Compressed(writer) => {
                writer.into_inner()?.finish()?;
                Ok(())
            }
        }
    }
}

fn write_unitig<W: Write>(writer: &mut W, index: usize, sequence: &str) -> io::Result<()> {
    writeln!(writer, ">unitig_{} length_{}", index, sequence.len())?;
    let bytes = sequence.as_bytes();
    for chunk in bytes.chunks(LINE_WIDTH) {
        writer.write_all(chunk)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}
