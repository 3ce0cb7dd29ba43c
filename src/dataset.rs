//! Supervised examples derived from an [`InteractionGraph`].
//!
//! Each example pairs a node's activity and its out-neighbors' activities in
//! one bucket with the change of the node's activity into the next bucket.

use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CadenceError, Result};
use crate::graph::InteractionGraph;

/// Model input: own activity plus neighbor activities in ascending id order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, Vec<f64>)", into = "(f64, Vec<f64>)")]
pub struct Feature {
    pub own_activity: f64,
    pub neighbor_activities: Vec<f64>,
}

impl Feature {
    pub fn new(own_activity: f64, neighbor_activities: Vec<f64>) -> Self {
        Self {
            own_activity,
            neighbor_activities,
        }
    }

    /// At least one neighbor was active.
    pub fn has_active_neighbor(&self) -> bool {
        self.neighbor_activities.iter().any(|&x| x != 0.0)
    }
}

impl From<(f64, Vec<f64>)> for Feature {
    fn from((own_activity, neighbor_activities): (f64, Vec<f64>)) -> Self {
        Self::new(own_activity, neighbor_activities)
    }
}

impl From<Feature> for (f64, Vec<f64>) {
    fn from(feature: Feature) -> Self {
        (feature.own_activity, feature.neighbor_activities)
    }
}

/// A `(feature, target)` pair, serialized as `[[own, [neighbors...]], target]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(Feature, f64)", into = "(Feature, f64)")]
pub struct Example {
    pub feature: Feature,
    /// Discrete derivative of own activity.
    pub target: f64,
}

impl Example {
    pub fn new(feature: Feature, target: f64) -> Self {
        Self { feature, target }
    }
}

impl From<(Feature, f64)> for Example {
    fn from((feature, target): (Feature, f64)) -> Self {
        Self::new(feature, target)
    }
}

impl From<Example> for (Feature, f64) {
    fn from(example: Example) -> Self {
        (example.feature, example.target)
    }
}

pub type Dataset = Vec<Example>;

/// One example per node in `1..=max_id` and bucket in `0..buckets - 1`.
///
/// Node 0 is reserved in the source data and skipped. `derivatives` must be
/// the first difference of `graph.activity()`: one row per node and one
/// column fewer than the activity matrix.
pub fn construct(graph: &InteractionGraph, derivatives: &Array2<f64>) -> Result<Dataset> {
    let activity = graph.activity();
    let expected = (activity.nrows(), activity.ncols().saturating_sub(1));
    if derivatives.dim() != expected {
        return Err(CadenceError::ShapeMismatch {
            expected,
            found: derivatives.dim(),
        });
    }
    let steps = derivatives.ncols();
    let mut dataset = Vec::with_capacity(graph.max_id() as usize * steps);

    for node in 1..=graph.max_id() {
        let neighbors = graph.out_neighbors(node);
        let row = node as usize;
        for bucket in 0..steps {
            let feature = Feature::new(
                activity[[row, bucket]],
                neighbors
                    .iter()
                    .map(|&n| activity[[n as usize, bucket]])
                    .collect(),
            );
            dataset.push(Example::new(feature, derivatives[[row, bucket]]));
        }
    }

    if dataset.is_empty() {
        return Err(CadenceError::EmptyDataset(
            "need at least two buckets and one non-reserved node",
        ));
    }

    info!("constructed dataset with {} examples", dataset.len());
    Ok(dataset)
}

/// Build the dataset straight from a graph.
pub fn from_graph(graph: &InteractionGraph) -> Result<Dataset> {
    construct(graph, &graph.derivatives())
}

/// Subsample to at most `size` examples, half with an active neighbor.
///
/// Takes up to `size / 2` examples with an active neighbor, then fills up to
/// `size` from the rest, both in original order, and shuffles the result.
pub fn balance<R>(dataset: &[Example], size: usize, rng: &mut R) -> Dataset
where
    R: Rng + ?Sized,
{
    let (active, quiet): (Vec<&Example>, Vec<&Example>) = dataset
        .iter()
        .partition(|example| example.feature.has_active_neighbor());

    let mut balanced: Dataset = active.into_iter().take(size / 2).cloned().collect();
    let active_count = balanced.len();
    balanced.extend(quiet.into_iter().take(size - active_count).cloned());
    balanced.shuffle(rng);

    info!(
        "balanced dataset: {} examples ({} with active neighbors)",
        balanced.len(),
        active_count
    );
    balanced
}
