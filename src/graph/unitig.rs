// src/graph/unitig.rs
//! Streaming unitig assembly over the sorted edge file.
//!
//! A unitig is a maximal walk whose interior vertices all have in-degree and
//! out-degree exactly 1. Walks start at non-simple vertices; a traversed-edge
//! set keyed `(from << 32) | to` guarantees each directed edge contributes to
//! at most one unitig and makes walks terminate on cyclic graphs. A second
//! sweep starts from any edge the first pass never reached, which picks up
//! pure cycles. Start vertices are taken in ascending id order in both
//! passes, so the output is a pure function of the input.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use ahash::{AHashMap, AHashSet};
use tracing::{debug, info};

use crate::graph::edge::DegreeMaps;

const MAX_BUBBLE_DEPTH: usize = 20;
const MAX_BUBBLE_LENGTH: usize = 1500;

/// An outgoing edge held in the in-memory adjacency.
#[derive(Debug, Clone)]
struct Edge {
    to: u32,
    sequence: String,
}

/// The loaded graph plus assembly parameters.
pub struct UnitigAssembler {
    adjacency: AHashMap<u32, Vec<Edge>>,
    k: usize,
    pop_bubbles: bool,
}

impl UnitigAssembler {
    /// Load adjacency from a sorted edge file in one pass.
    pub fn from_sorted_file(path: &Path, k: usize, pop_bubbles: bool) -> io::Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut adjacency: AHashMap<u32, Vec<Edge>> = AHashMap::new();

        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let mut fields = line.splitn(3, '\t');
            let parse = |field: Option<&str>| {
                field
                    .and_then(|f| f.parse::<u32>().ok())
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "malformed edge record"))
            };
            let from = parse(fields.next())?;
            let to = parse(fields.next())?;
            let sequence = fields
                .next()
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "edge record missing sequence"))?
                .to_string();
            if sequence.len() < k {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("edge sequence shorter than k: {:?}", sequence),
                ));
            }
            adjacency.entry(from).or_default().push(Edge { to, sequence });
        }

        debug!("adjacency loaded: {} nodes with outgoing edges", adjacency.len());
        Ok(Self { adjacency, k, pop_bubbles })
    }

    /// Build directly from records, for in-memory callers.
    pub fn from_records(
        records: impl IntoIterator<Item = crate::graph::edge::EdgeRecord>,
        k: usize,
        pop_bubbles: bool,
    ) -> Self {
        let mut adjacency: AHashMap<u32, Vec<Edge>> = AHashMap::new();
        for record in records {
            adjacency
                .entry(record.from)
                .or_default()
                .push(Edge { to: record.to, sequence: record.sequence });
        }
        Self { adjacency, k, pop_bubbles }
    }

    /// Enumerate all unitigs.
    pub fn assemble(&self, degrees: &DegreeMaps) -> Vec<String> {
        let mut traversed: AHashSet<u64> = AHashSet::new();
        let mut unitigs = Vec::new();

        for node in degrees.all_nodes() {
            if degrees.is_simple(node) {
                continue;
            }
            let Some(edges) = self.adjacency.get(&node) else { continue };

            if self.pop_bubbles && edges.len() >= 2 {
                if let Some((sequence, merge_node)) = self.resolve_bubble(node, degrees, &mut traversed)
                {
                    if let Some(unitig) = self.extend_walk(sequence, merge_node, degrees, &mut traversed)
                    {
                        unitigs.push(unitig);
                    }
                    continue;
                }
            }

            for edge in edges {
                if let Some(unitig) = self.walk_path(node, edge, degrees, &mut traversed) {
                    unitigs.push(unitig);
                }
            }
        }

        // Second sweep: anything untraversed now sits on a pure cycle.
        let mut starts: Vec<u32> = self.adjacency.keys().copied().collect();
        starts.sort_unstable();
        for node in starts {
            for edge in &self.adjacency[&node] {
                if !traversed.contains(&edge_key(node, edge.to)) {
                    if let Some(unitig) = self.walk_path(node, edge, degrees, &mut traversed) {
                        unitigs.push(unitig);
                    }
                }
            }
        }

        info!("assembled {} unitigs", unitigs.len());
        unitigs
    }

    /// Walk one unitig beginning with `first`, marking edges as traversed.
    fn walk_path(
        &self,
        start: u32,
        first: &Edge,
        degrees: &DegreeMaps,
        traversed: &mut AHashSet<u64>,
    ) -> Option<String> {
        if !traversed.insert(edge_key(start, first.to)) {
            return None;
        }
        self.extend_walk(first.sequence.clone(), first.to, degrees, traversed)
    }

    /// Extend a partial unitig through simple vertices until the corridor
    /// ends. Emits only sequences of at least k bases.
    fn extend_walk(
        &self,
        mut sequence: String,
        mut current: u32,
        degrees: &DegreeMaps,
        traversed: &mut AHashSet<u64>,
    ) -> Option<String> {
        while degrees.is_simple(current) {
            let Some(next) = self.adjacency.get(&current).and_then(|edges| edges.first()) else {
                break;
            };
            if !traversed.insert(edge_key(current, next.to)) {
                break;
            }
            sequence.push_str(&next.sequence[self.k..]);
            current = next.to;
        }
        (sequence.len() >= self.k).then_some(sequence)
    }

    /// Try to collapse a bubble rooted at `branch_node`.
    ///
    /// Every outgoing branch is walked as a simple corridor, giving up past
    /// `MAX_BUBBLE_DEPTH` edges or `MAX_BUBBLE_LENGTH` bases. If all branches
    /// are valid and converge on one merge node, the lexicographically
    /// smallest branch survives and every branch edge is retired.
    fn resolve_bubble(
        &self,
        branch_node: u32,
        degrees: &DegreeMaps,
        traversed: &mut AHashSet<u64>,
    ) -> Option<(String, u32)> {
        let branches = self.adjacency.get(&branch_node)?;
        if branches.len() < 2 {
            return None;
        }

        let mut resolved: Vec<(String, Vec<u64>)> = Vec::new();
        let mut merge_node: Option<u32> = None;

        for branch in branches {
            if traversed.contains(&edge_key(branch_node, branch.to)) {
                return None;
            }
            let mut sequence = branch.sequence.clone();
            let mut keys = vec![edge_key(branch_node, branch.to)];
            let mut current = branch.to;

            for _ in 0..MAX_BUBBLE_DEPTH {
                if sequence.len() > MAX_BUBBLE_LENGTH {
                    return None;
                }
                if degrees.in_degree(current) > 1 {
                    break;
                }
                if degrees.out_degree(current) != 1 {
                    return None;
                }
                let next = self.adjacency.get(&current).and_then(|edges| edges.first())?;
                let key = edge_key(current, next.to);
                if traversed.contains(&key) {
                    return None;
                }
                sequence.push_str(&next.sequence[self.k..]);
                keys.push(key);
                current = next.to;
            }

            match merge_node {
                None => merge_node = Some(current),
                Some(node) if node != current => return None,
                Some(_) => {}
            }
            resolved.push((sequence, keys));
        }

        // All branches collapse; only the smallest sequence survives.
        let mut best: Option<String> = None;
        for (sequence, keys) in resolved {
            traversed.extend(keys);
            best = match best {
                Some(current) if current <= sequence => Some(current),
                _ => Some(sequence),
            };
        }
        best.map(|sequence| (sequence, merge_node.unwrap_or(branch_node)))
    }
}

#[inline]
fn edge_key(from: u32, to: u32) -> u64 {
    (u64::from(from) << 32) | u64::from(to)
}
