// src/sort/external.rs
//! External merge sort for the edge file.
//!
//! Edge records are text lines `"<from>\t<to>\t<sequence>"` keyed by the
//! integer prefix before the first tab. The file can be far larger than RAM:
//! records are buffered up to a byte budget, each full buffer is sorted and
//! flushed as a run file, and the runs are k-way merged through a min-heap of
//! one cursor per run. Ties on the key keep their run-local order (the buffer
//! sort is stable); across runs they fall in heap order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info};

/// RAM-bounded sorter writing run files under a working directory.
pub struct ExternalSorter {
    work_dir: PathBuf,
    buffer_bytes: usize,
    run_paths: Vec<PathBuf>,
}

impl ExternalSorter {
    pub fn new(work_dir: impl AsRef<Path>, buffer_bytes: usize) -> Self {
        Self {
            work_dir: work_dir.as_ref().to_path_buf(),
            buffer_bytes: buffer_bytes.max(1),
            run_paths: Vec::new(),
        }
    }

    /// Sort `input` into `output` by ascending integer key. Returns the
    /// record count. Run files are deleted on success.
    pub fn sort_file(&mut self, input: &Path, output: &Path) -> io::Result<u64> {
        let reader = BufReader::new(File::open(input)?);
        let mut buffer: Vec<(u32, String)> = Vec::new();
        let mut buffered_bytes = 0usize;
        let mut total = 0u64;

        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let key = parse_key(&line)?;
            buffered_bytes += line.len();
            buffer.push((key, line));
            total += 1;

            if buffered_bytes >= self.buffer_bytes {
                self.flush_run(&mut buffer)?;
                buffered_bytes = 0;
            }
        }
        if !buffer.is_empty() {
            self.flush_run(&mut buffer)?;
        }

        debug!("external sort: {} records in {} runs", total, self.run_paths.len());
        self.merge_runs(output)?;

        for path in self.run_paths.drain(..) {
            fs::remove_file(path)?;
        }
        Ok(total)
    }

    /// Stable-sort the buffer by key and write it out as the next run file.
    fn flush_run(&mut self, buffer: &mut Vec<(u32, String)>) -> io::Result<()> {
        buffer.par_sort_by_key(|(key, _)| *key);

        let path = self.work_dir.join(format!("run_{}.tmp", self.run_paths.len()));
        let mut writer = BufWriter::new(File::create(&path)?);
        for (_, line) in buffer.iter() {
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;
        buffer.clear();
        self.run_paths.push(path);
        Ok(())
    }

    /// Min-heap merge of all run files into the sorted output.
    fn merge_runs(&self, output: &Path) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(output)?);

        let mut cursors = Vec::with_capacity(self.run_paths.len());
        for path in &self.run_paths {
            cursors.push(BufReader::new(File::open(path)?));
        }

        let mut heap: BinaryHeap<Reverse<(u32, usize)>> = BinaryHeap::new();
        let mut current: Vec<Option<String>> = vec![None; cursors.len()];

        for (idx, cursor) in cursors.iter_mut().enumerate() {
            if let Some((key, line)) = read_record(cursor)? {
                current[idx] = Some(line);
                heap.push(Reverse((key, idx)));
            }
        }

        while let Some(Reverse((_, idx))) = heap.pop() {
            // The slot is always refilled or left empty before the next pop.
            if let Some(line) = current[idx].take() {
                writeln!(writer, "{}", line)?;
            }
            if let Some((key, line)) = read_record(&mut cursors[idx])? {
                current[idx] = Some(line);
                heap.push(Reverse((key, idx)));
            }
        }

        writer.flush()
    }
}

impl Drop for ExternalSorter {
    fn drop(&mut self) {
        for path in &self.run_paths {
            let _ = fs::remove_file(path);
        }
    }
}

fn parse_key(line: &str) -> io::Result<u32> {
    let prefix = line.split('\t').next().unwrap_or("");
    prefix.parse::<u32>().map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("edge record without integer key: {:?}", prefix),
        )
    })
}

fn read_record(reader: &mut BufReader<File>) -> io::Result<Option<(u32, String)>> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches('\n');
        if trimmed.is_empty() {
            continue;
        }
        return Ok(Some((parse_key(trimmed)?, trimmed.to_string())));
    }
}

/// Sort an edge file with a byte budget chosen for the workload.
pub fn sort_edge_file(
    work_dir: &Path,
    input: &Path,
    output: &Path,
    buffer_bytes: usize,
) -> io::Result<u64> {
    let mut sorter = ExternalSorter::new(work_dir, buffer_bytes);
    let records = sorter.sort_file(input, output)?;
    info!("sorted {} edge records", records);
    Ok(records)
}
