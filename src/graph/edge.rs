// src/graph/edge.rs
//! Edge extraction: consecutive minimizer occurrences in a read become
//! directed edges carrying the exact read substring between them.
//!
//! Edges, not nodes, hold nucleotide content. An edge's sequence runs from
//! the first base of the source k-mer through the last base of the target
//! k-mer, so following an edge extends an assembly by `len - k` bases beyond
//! the shared leading k-mer.

use std::io::{self, BufWriter, Write};
use std::path::Path;

use ahash::{AHashMap, AHashSet};

use crate::kmer::minimizer::MinimizerOccurrence;

/// A directed edge record as it lives in the edge files.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeRecord {
    pub from: u32,
    pub to: u32,
    pub sequence: String,
}

/// Collects the dataset-wide deduplicated edge set, its degree maps, and the
/// unsorted edge file, in first-seen order.
pub struct EdgeCollector<W: Write> {
    writer: BufWriter<W>,
    seen: AHashSet<EdgeRecord>,
    in_degrees: AHashMap<u32, u32>,
    out_degrees: AHashMap<u32, u32>,
}

impl<W: Write> EdgeCollector<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: BufWriter::new(sink),
            seen: AHashSet::new(),
            in_degrees: AHashMap::new(),
            out_degrees: AHashMap::new(),
        }
    }

    /// Extract the edges of one occurrence chain against its read.
    ///
    /// Consecutive pairs with equal ids (tandem-close minimizers) are
    /// skipped; the slice end is clamped to the read length. Each distinct
    /// `(from, to, sequence)` is written and counted once across the whole
    /// dataset.
    pub fn add_chain(&mut self, read: &str, chain: &[MinimizerOccurrence], k: usize) -> io::Result<()> {
        for pair in chain.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            if from.id == to.id {
                continue;
            }
            let end = (to.position + k).min(read.len());
            let record = EdgeRecord {
                from: from.id,
                to: to.id,
                sequence: read[from.position..end].to_string(),
            };
            if self.seen.contains(&record) {
                continue;
            }
            writeln!(self.writer, "{}\t{}\t{}", record.from, record.to, record.sequence)?;
            *self.out_degrees.entry(record.from).or_insert(0) += 1;
            *self.in_degrees.entry(record.to).or_insert(0) += 1;
            self.seen.insert(record);
        }
        Ok(())
    }

    pub fn edge_count(&self) -> usize {
        self.seen.len()
    }

    /// Flush the edge file and release the dedup set, keeping the degrees.
    pub fn finish(mut self) -> io::Result<DegreeMaps> {
        self.writer.flush()?;
        Ok(DegreeMaps { in_degrees: self.in_degrees, out_degrees: self.out_degrees })
    }
}

/// In/out degree of every node, computed from the deduplicated edge set.
#[derive(Debug, Default)]
pub struct DegreeMaps {
    in_degrees: AHashMap<u32, u32>,
    out_degrees: AHashMap<u32, u32>,
}

impl DegreeMaps {
    /// Tally degrees straight from a deduplicated record set.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a EdgeRecord>) -> Self {
        let mut maps = Self::default();
        for record in records {
            *maps.out_degrees.entry(record.from).or_insert(0) += 1;
            *maps.in_degrees.entry(record.to).or_insert(0) += 1;
        }
        maps
    }

    #[inline]
    pub fn in_degree(&self, id: u32) -> u32 {
        self.in_degrees.get(&id).copied().unwrap_or(0)
    }

    #[inline]
    pub fn out_degree(&self, id: u32) -> u32 {
        self.out_degrees.get(&id).copied().unwrap_or(0)
    }

    /// A node is simple when it sits inside a corridor: exactly one way in
    /// and one way out.
    #[inline]
    pub fn is_simple(&self, id: u32) -> bool {
        self.in_degree(id) == 1 && self.out_degree(id) == 1
    }

    /// Every node appearing in either map, ascending.
    pub fn all_nodes(&self) -> Vec<u32> {
        let mut nodes: Vec<u32> = self
            .in_degrees
            .keys()
            .chain(self.out_degrees.keys())
            .copied()
            .collect();
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }

    pub fn node_count(&self) -> usize {
        self.all_nodes().len()
    }
}

/// Convenience wrapper creating the unsorted edge file on disk.
pub fn edge_file_collector(path: &Path) -> io::Result<EdgeCollector<std::fs::File>> {
    Ok(EdgeCollector::new(std::fs::File::create(path)?))
}
