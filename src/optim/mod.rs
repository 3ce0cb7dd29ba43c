//! Optimizers - each fits the derivative model to a dataset its own way.

pub mod genetic;
pub mod gradient;

use crate::dataset::Example;
use crate::error::Result;
use crate::model::Parameters;

pub use genetic::{fit_genetic, fit_genetic_with_rng, GeneticConfig, GeneticFit};
pub use gradient::{fit_gradient_descent, GradientDescentConfig, GradientDescentFit};

/// Trait for all optimizers.
pub trait Optimizer {
    /// Name of this optimizer.
    fn name(&self) -> &'static str;

    /// Fit the model and return the final parameter vector.
    fn fit(&self, dataset: &[Example]) -> Result<Parameters>;
}

pub struct GradientDescent {
    pub config: GradientDescentConfig,
}

impl GradientDescent {
    pub fn new(config: GradientDescentConfig) -> Self {
        Self { config }
    }
}

impl Optimizer for GradientDescent {
    fn name(&self) -> &'static str {
        "gradient"
    }

    fn fit(&self, dataset: &[Example]) -> Result<Parameters> {
        fit_gradient_descent(dataset, &self.config).map(|fit| fit.parameters)
    }
}

pub struct Genetic {
    pub config: GeneticConfig,
}

impl Genetic {
    pub fn new(config: GeneticConfig) -> Self {
        Self { config }
    }
}

impl Optimizer for Genetic {
    fn name(&self) -> &'static str {
        "genetic"
    }

    fn fit(&self, dataset: &[Example]) -> Result<Parameters> {
        fit_genetic(dataset, &self.config).map(|fit| fit.parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Feature;

    fn dataset() -> Vec<Example> {
        vec![
            Example::new(Feature::new(2.0, vec![1.0, 0.0]), 5.0),
            Example::new(Feature::new(0.0, vec![]), 0.0),
            Example::new(Feature::new(1.0, vec![3.0]), 1.5),
        ]
    }

    #[test]
    fn both_optimizers_run_through_the_trait() {
        let optimizers: Vec<Box<dyn Optimizer>> = vec![
            Box::new(GradientDescent::new(GradientDescentConfig {
                iterations: 3,
                learning_rate: 0.01,
            })),
            Box::new(Genetic::new(GeneticConfig {
                population_size: 10,
                generations: 3,
                ..GeneticConfig::default()
            })),
        ];

        let data = dataset();
        for optimizer in &optimizers {
            let params = optimizer.fit(&data).unwrap();
            assert!(
                params.first_non_finite().is_none(),
                "{} produced {}",
                optimizer.name(),
                params
            );
        }
    }
}
