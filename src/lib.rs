//! Cadence - activity-rate dynamics on temporal interaction graphs.
//!
//! Builds a regression dataset from a timestamped directed interaction
//! graph and fits a nine-parameter model of how a node's activity changes
//! given its own activity and its neighbors' activity, either by gradient
//! descent or by genetic search.

pub mod config;
pub mod dataset;
pub mod error;
pub mod graph;
pub mod model;
pub mod optim;
pub mod store;

pub use config::CadenceConfig;
pub use dataset::{Dataset, Example, Feature};
pub use error::{CadenceError, Result};
pub use graph::{Edge, EdgeSource, InteractionGraph, TsvEdgeFile};
pub use model::Parameters;
pub use optim::Optimizer;
