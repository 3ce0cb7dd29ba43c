//! Interaction graph and per-bucket activity.
//!
//! Raw records are `(from, to, count, timestamp)` tuples. The builder makes
//! two passes over an [`EdgeSource`]:
//! - the first collects the directed "who talks to whom" graph, the largest
//!   node id and the observation window;
//! - the second fills the activity matrix, whose width depends on the window
//!   found by the first pass.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use ndarray::{s, Array2};
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use tracing::{info, warn};

use crate::error::{CadenceError, Result};

/// Lines starting with this marker are skipped.
pub const COMMENT_MARKER: char = '%';

/// Default bucket width: three hours, in seconds.
pub const DEFAULT_BUCKET_WIDTH: u64 = 3 * 60 * 60;

/// A single interaction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: u32,
    pub to: u32,
    /// Number of interactions folded into this record.
    pub count: u64,
    /// Unix timestamp in seconds.
    pub timestamp: i64,
}

impl Edge {
    pub fn new(from: u32, to: u32, count: u64, timestamp: i64) -> Self {
        Self {
            from,
            to,
            count,
            timestamp,
        }
    }
}

/// Parse one line of a whitespace-delimited record stream.
///
/// Returns `Ok(None)` for blank and comment lines. `line` is the 1-based line
/// number used in error messages.
pub fn parse_line(line: usize, text: &str) -> Result<Option<Edge>> {
    let text = text.trim();
    if text.is_empty() || text.starts_with(COMMENT_MARKER) {
        return Ok(None);
    }

    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() != 4 {
        return Err(CadenceError::MalformedRecord {
            line,
            reason: format!("expected 4 fields, found {}", fields.len()),
        });
    }

    let malformed = |name: &str, value: &str| CadenceError::MalformedRecord {
        line,
        reason: format!("invalid {}: {:?}", name, value),
    };

    let from = fields[0]
        .parse::<u32>()
        .map_err(|_| malformed("from id", fields[0]))?;
    let to = fields[1]
        .parse::<u32>()
        .map_err(|_| malformed("to id", fields[1]))?;
    let count = fields[2]
        .parse::<u64>()
        .ok()
        .filter(|&c| c > 0)
        .ok_or_else(|| malformed("count", fields[2]))?;
    let timestamp = fields[3]
        .parse::<i64>()
        .map_err(|_| malformed("timestamp", fields[3]))?;

    Ok(Some(Edge::new(from, to, count, timestamp)))
}

/// A record source that can be enumerated more than once.
pub trait EdgeSource {
    /// Start a fresh pass over every record.
    fn edges(&self) -> Result<Box<dyn Iterator<Item = Edge> + '_>>;
}

impl EdgeSource for [Edge] {
    fn edges(&self) -> Result<Box<dyn Iterator<Item = Edge> + '_>> {
        Ok(Box::new(self.iter().copied()))
    }
}

impl EdgeSource for Vec<Edge> {
    fn edges(&self) -> Result<Box<dyn Iterator<Item = Edge> + '_>> {
        self.as_slice().edges()
    }
}

/// Adapts a factory closure into an [`EdgeSource`].
pub struct FromFn<F>(pub F);

impl<F, I> EdgeSource for FromFn<F>
where
    F: Fn() -> I,
    I: IntoIterator<Item = Edge>,
    I::IntoIter: 'static,
{
    fn edges(&self) -> Result<Box<dyn Iterator<Item = Edge> + '_>> {
        Ok(Box::new((self.0)().into_iter()))
    }
}

/// Tab-separated record file, reopened on every pass.
///
/// Malformed lines are logged and skipped.
#[derive(Debug, Clone)]
pub struct TsvEdgeFile {
    path: PathBuf,
}

impl TsvEdgeFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl EdgeSource for TsvEdgeFile {
    fn edges(&self) -> Result<Box<dyn Iterator<Item = Edge> + '_>> {
        let reader = BufReader::new(File::open(&self.path)?);
        let iter = reader
            .lines()
            .enumerate()
            .filter_map(|(idx, line)| match line {
                Ok(text) => match parse_line(idx + 1, &text) {
                    Ok(edge) => edge,
                    Err(err) => {
                        warn!("skipping record: {}", err);
                        None
                    }
                },
                Err(err) => {
                    warn!("failed to read line {}: {}", idx + 1, err);
                    None
                }
            });
        Ok(Box::new(iter))
    }
}

/// Directed interaction graph plus the activity matrix built alongside it.
#[derive(Debug, Clone)]
pub struct InteractionGraph {
    graph: DiGraphMap<u32, ()>,
    /// `activity[[node, bucket]]`: summed counts sent by `node` in `bucket`.
    activity: Array2<f64>,
    max_id: u32,
    first_timestamp: i64,
}

impl InteractionGraph {
    /// Build the graph and activity matrix from a re-enumerable source.
    ///
    /// A `bucket_width` of zero is treated as one second.
    pub fn build<S>(source: &S, bucket_width: u64) -> Result<Self>
    where
        S: EdgeSource + ?Sized,
    {
        let width = bucket_width.max(1) as i64;

        let mut graph = DiGraphMap::new();
        let mut max_id = 0u32;
        let mut window: Option<(i64, i64)> = None;

        for edge in source.edges()? {
            graph.add_edge(edge.from, edge.to, ());
            max_id = max_id.max(edge.from).max(edge.to);
            window = Some(match window {
                None => (edge.timestamp, edge.timestamp),
                Some((first, last)) => (first.min(edge.timestamp), last.max(edge.timestamp)),
            });
        }

        let (first, last) = window.ok_or(CadenceError::EmptyDataset("no edge records"))?;
        let bucket_count = ((last - first) / width) as usize + 1;

        let mut activity = Array2::<f64>::zeros((max_id as usize + 1, bucket_count));
        for edge in source.edges()? {
            let offset = edge.timestamp - first;
            let bucket = (offset / width) as usize;
            if offset < 0 || bucket >= bucket_count || edge.from > max_id {
                // The source changed between passes.
                warn!(
                    "record {} -> {} at {} is outside the first-pass window",
                    edge.from, edge.to, edge.timestamp
                );
                continue;
            }
            activity[[edge.from as usize, bucket]] += edge.count as f64;
        }

        info!(
            "built interaction graph: {} nodes, {} edges, {} buckets",
            graph.node_count(),
            graph.edge_count(),
            bucket_count
        );

        Ok(Self {
            graph,
            activity,
            max_id,
            first_timestamp: first,
        })
    }

    /// Largest node id seen in either endpoint.
    pub fn max_id(&self) -> u32 {
        self.max_id
    }

    pub fn bucket_count(&self) -> usize {
        self.activity.ncols()
    }

    pub fn first_timestamp(&self) -> i64 {
        self.first_timestamp
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Out-neighbors of `node` in ascending id order.
    pub fn out_neighbors(&self, node: u32) -> Vec<u32> {
        let mut neighbors: Vec<u32> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .collect();
        neighbors.sort_unstable();
        neighbors
    }

    pub fn activity(&self) -> &Array2<f64> {
        &self.activity
    }

    /// First difference of the activity matrix along the time axis.
    pub fn derivatives(&self) -> Array2<f64> {
        &self.activity.slice(s![.., 1..]) - &self.activity.slice(s![.., ..-1])
    }
}
