//! Error type shared by the dataset pipeline and both optimizers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CadenceError {
    /// No usable edges, buckets or examples were available.
    #[error("dataset is empty: {0}")]
    EmptyDataset(&'static str),

    /// A parameter became NaN or infinite after an update.
    #[error("gradient step produced a non-finite {parameter} at iteration {iteration}")]
    InvalidGradientStep {
        iteration: usize,
        parameter: &'static str,
    },

    /// A raw record line could not be parsed.
    #[error("malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// A derivative matrix does not line up with the activity matrix.
    #[error("derivative matrix is {found:?}, expected {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serde error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CadenceError>;
