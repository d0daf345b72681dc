// src/io/fastq.rs
//! Streaming FASTQ input and output, with transparent gzip handling.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

/// One 4-line FASTQ record.
#[derive(Debug, Clone)]
pub struct FastqRecord {
    pub header: String,
    pub sequence: String,
    pub plus: String,
    pub quality: String,
}

impl FastqRecord {
    /// The read name: the header after `@`, up to the first whitespace.
    pub fn name(&self) -> &str {
        self.header
            .trim_start_matches('@')
            .split_whitespace()
            .next()
            .unwrap_or("")
    }
}

/// Open a FASTQ file for reading; `.gz` paths are decompressed on the fly.
pub fn open_fastq(path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Stream records off a reader with bounded memory.
///
/// A truncated final record (fewer than four lines at EOF) is dropped rather
/// than reported, matching the tolerance for clipped downloads.
pub fn stream_fastq_records<R: BufRead>(reader: R) -> impl Iterator<Item = FastqRecord> {
    FastqStreamParser { lines: reader.lines() }
}

struct FastqStreamParser<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    lines: I,
}

impl<I> Iterator for FastqStreamParser<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    type Item = FastqRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let mut take = || match self.lines.next() {
            Some(Ok(line)) => Some(line),
            _ => None,
        };
        Some(FastqRecord {
            header: take()?,
            sequence: take()?,
            plus: take()?,
            quality: take()?,
        })
    }
}

/// Record writer over plain or gzip output.
pub enum FastqWriter {
    Plain(BufWriter<File>),
    Compressed(BufWriter<GzEncoder<File>>),
}

impl FastqWriter {
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        if path.extension().is_some_and(|ext| ext == "gz") {
            let encoder = GzEncoder::new(file, Compression::default());
            Ok(FastqWriter::Compressed(BufWriter::new(encoder)))
        } else {
            Ok(FastqWriter::Plain(BufWriter::new(file)))
        }
    }

    pub fn write_record(&mut self, record: &FastqRecord) -> io::Result<()> {
        match self {
            FastqWriter::Plain(writer) => write_lines(writer, record),
            FastqWriter::Compressed(writer) => write_lines(writer, record),
        }
    }

    pub fn finish(self) -> io::Result<()> {
        match self {
            FastqWriter::Plain(mut writer) => writer.flush(),
            FastqWriter::Compressed(writer) => {
                writer.into_inner()?.finish()?;
                Ok(())
            }
        }
    }
}

fn write_lines<W: Write>(writer: &mut W, record: &FastqRecord) -> io::Result<()> {
    writeln!(writer, "{}", record.header)?;
    writeln!(writer, "{}", record.sequence)?;
    writeln!(writer, "{}", record.plus)?;
    writeln!(writer, "{}", record.quality)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_stream_parses_records() {
        let data = "@r1 extra\nACGT\n+\nIIII\n@r2\nGGTT\n+\nIIII\n";
        let records: Vec<_> = stream_fastq_records(Cursor::new(data)).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name(), "r1");
        assert_eq!(records[0].sequence, "ACGT");
        assert_eq!(records[1].name(), "r2");
    }

    #[test]
    fn test_truncated_final_record_dropped() {
        let data = "@r1\nACGT\n+\nIIII\n@r2\nGGTT\n";
        let records: Vec<_> = stream_fastq_records(Cursor::new(data)).collect();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_writer_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.fastq");
        let record = FastqRecord {
            header: "@r1".into(),
            sequence: "ACGT".into(),
            plus: "+".into(),
            quality: "IIII".into(),
        };
        let mut writer = FastqWriter::create(&path).unwrap();
        writer.write_record(&record).unwrap();
        writer.finish().unwrap();

        let reader = open_fastq(&path).unwrap();
        let back: Vec<_> = stream_fastq_records(reader).collect();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].sequence, "ACGT");
    }
}
