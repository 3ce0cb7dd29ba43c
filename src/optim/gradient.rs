//! Batch gradient descent on mean squared error.
//!
//! Parameters start at 0.1 each. Every iteration evaluates the model and its
//! nine partials on every example, then steps against the gradient of
//!
//! ```text
//! MSE = 1/n * Σ (target - predicted)^2
//! ∂MSE/∂θ = -2/n * Σ (target - predicted) * ∂predicted/∂θ
//! ```

use rayon::prelude::*;
use serde::Deserialize;
use tracing::{debug, info};

use crate::dataset::Example;
use crate::error::{CadenceError, Result};
use crate::model::{Gradient, Parameters, PARAMETER_COUNT};

#[derive(Debug, Clone, Deserialize)]
pub struct GradientDescentConfig {
    #[serde(default = "default_iterations")]
    pub iterations: usize,

    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
}

impl Default for GradientDescentConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            learning_rate: default_learning_rate(),
        }
    }
}

fn default_iterations() -> usize {
    100
}

fn default_learning_rate() -> f64 {
    0.05
}

/// Result of a gradient descent run.
#[derive(Debug, Clone)]
pub struct GradientDescentFit {
    pub parameters: Parameters,
    /// `mse_trace[t]` is the error at the start of iteration `t`.
    pub mse_trace: Vec<f64>,
}

/// Summed squared residual and residual-weighted partials.
fn accumulate(params: &Parameters, dataset: &[Example]) -> (f64, Gradient) {
    dataset
        .par_iter()
        .map(|example| {
            let (predicted, partials) = params.evaluate(&example.feature);
            let residual = example.target - predicted;
            (residual * residual, partials.map(|p| residual * p))
        })
        .reduce(
            || (0.0, [0.0; PARAMETER_COUNT]),
            |(sq_a, mut grad_a), (sq_b, grad_b)| {
                for (a, b) in grad_a.iter_mut().zip(grad_b) {
                    *a += b;
                }
                (sq_a + sq_b, grad_a)
            },
        )
}

pub fn fit_gradient_descent(
    dataset: &[Example],
    config: &GradientDescentConfig,
) -> Result<GradientDescentFit> {
    if dataset.is_empty() {
        return Err(CadenceError::EmptyDataset("gradient descent needs examples"));
    }

    let n = dataset.len() as f64;
    let mut params = Parameters::default();
    let mut mse_trace = Vec::with_capacity(config.iterations);

    for iteration in 0..config.iterations {
        let (squared, weighted) = accumulate(&params, dataset);
        let mse = squared / n;
        mse_trace.push(mse);
        debug!(iteration, mse, "gradient descent step");

        let mut values = params.to_array();
        for (value, w) in values.iter_mut().zip(weighted) {
            let gradient = -2.0 * w / n;
            *value -= config.learning_rate * gradient;
        }
        params = Parameters::from_array(values);

        if let Some(parameter) = params.first_non_finite() {
            return Err(CadenceError::InvalidGradientStep {
                iteration,
                parameter,
            });
        }
    }

    info!(
        "gradient descent finished after {} iterations: {}",
        config.iterations, params
    );
    Ok(GradientDescentFit {
        parameters: params,
        mse_trace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Feature;

    /// Targets generated from `truth` without noise.
    fn synthetic(truth: &Parameters) -> Vec<Example> {
        let neighbor_sets: [&[f64]; 4] = [&[], &[1.0], &[0.0, 2.0], &[1.0, 2.0]];
        let mut dataset = Vec::new();
        for own in [0.0, 1.0, 2.0, 3.0] {
            for neighbors in neighbor_sets {
                let feature = Feature::new(own, neighbors.to_vec());
                let target = truth.predict(&feature);
                dataset.push(Example::new(feature, target));
            }
        }
        dataset
    }

    #[test]
    fn converges_on_noise_free_data() {
        // Every coefficient and exponent differs from the 0.1 starting point.
        let truth = Parameters::from_array([0.3, 0.5, 0.2, 0.1, 0.4, 0.2, 0.8, 0.5, 0.6]);
        let dataset = synthetic(&truth);
        let config = GradientDescentConfig {
            iterations: 20_000,
            learning_rate: 0.02,
        };

        let fit = fit_gradient_descent(&dataset, &config).unwrap();
        let first = fit.mse_trace[0];
        let last = *fit.mse_trace.last().unwrap();

        assert!(first > 0.5, "initial error {}", first);
        assert!(last < 1e-3, "final error {}", last);
        assert!(fit.parameters.mse(&dataset) < 1e-3);
        for pair in fit.mse_trace.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-12, "error rose: {:?}", pair);
        }
    }

    #[test]
    fn error_never_increases_with_small_steps() {
        let truth = Parameters {
            a1: -0.2,
            a2: 0.3,
            ..Parameters::default()
        };
        let dataset = synthetic(&truth);
        let config = GradientDescentConfig {
            iterations: 200,
            learning_rate: 0.02,
        };

        let fit = fit_gradient_descent(&dataset, &config).unwrap();
        for pair in fit.mse_trace.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-12, "error rose: {:?}", pair);
        }
        assert!(fit.mse_trace[199] < fit.mse_trace[0]);
    }

    #[test]
    fn scenario_initial_error() {
        let dataset = vec![
            Example::new(Feature::new(2.0, vec![1.0, 0.0]), 5.0),
            Example::new(Feature::new(0.0, vec![]), 0.0),
        ];
        let config = GradientDescentConfig {
            iterations: 2,
            learning_rate: 0.01,
        };

        let fit = fit_gradient_descent(&dataset, &config).unwrap();
        let expected = Parameters::default().mse(&dataset);
        assert_eq!(fit.mse_trace.len(), 2);
        assert!((fit.mse_trace[0] - expected).abs() < 1e-12);
        assert!(fit.mse_trace[1] < fit.mse_trace[0]);
    }

    #[test]
    fn zero_iterations_returns_the_starting_point() {
        let dataset = synthetic(&Parameters::default());
        let config = GradientDescentConfig {
            iterations: 0,
            learning_rate: 0.05,
        };

        let fit = fit_gradient_descent(&dataset, &config).unwrap();
        assert_eq!(fit.parameters, Parameters::splat(0.1));
        assert!(fit.mse_trace.is_empty());
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let result = fit_gradient_descent(&[], &GradientDescentConfig::default());
        assert!(matches!(result, Err(CadenceError::EmptyDataset(_))));
    }

    #[test]
    fn divergence_is_reported() {
        let dataset = synthetic(&Parameters {
            a1: 3.0,
            ..Parameters::default()
        });
        let config = GradientDescentConfig {
            iterations: 10,
            learning_rate: 1e300,
        };

        let result = fit_gradient_descent(&dataset, &config);
        assert!(matches!(
            result,
            Err(CadenceError::InvalidGradientStep { .. })
        ));
    }
}
