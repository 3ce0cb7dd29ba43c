//! Genetic search over parameter vectors.
//!
//! Generational replacement without elitism: each generation every slot is
//! refilled by roulette-selecting two parents, crossing them at a single cut
//! and mutating the child.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::dataset::Example;
use crate::error::{CadenceError, Result};
use crate::model::{Parameters, PARAMETER_COUNT};

pub type Chromosome = [f64; PARAMETER_COUNT];

/// Fitness assigned to a chromosome with exactly zero error.
pub const PERFECT_FITNESS: f64 = f64::INFINITY;

#[derive(Debug, Clone, Deserialize)]
pub struct GeneticConfig {
    #[serde(default = "default_population_size")]
    pub population_size: usize,

    #[serde(default = "default_generations")]
    pub generations: usize,

    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,

    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            generations: default_generations(),
            mutation_rate: default_mutation_rate(),
            seed: default_seed(),
        }
    }
}

fn default_population_size() -> usize {
    100
}

fn default_generations() -> usize {
    1000
}

fn default_mutation_rate() -> f64 {
    0.05
}

fn default_seed() -> u64 {
    42
}

/// Result of a genetic run.
#[derive(Debug, Clone)]
pub struct GeneticFit {
    /// Fittest chromosome of the final population.
    pub parameters: Parameters,
    /// Best fitness of each generation before reproduction.
    pub best_fitness_trace: Vec<f64>,
}

pub fn random_gene<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(-1.0..1.0)
}

pub fn initial_population<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Vec<Chromosome> {
    (0..size)
        .map(|_| std::array::from_fn(|_| random_gene(rng)))
        .collect()
}

/// Inverse mean squared error.
///
/// Zero error maps to [`PERFECT_FITNESS`]; a non-finite error maps to zero.
pub fn fitness(chromosome: &Chromosome, dataset: &[Example]) -> f64 {
    let mse = Parameters::from_array(*chromosome).mse(dataset);
    if mse == 0.0 {
        PERFECT_FITNESS
    } else if mse.is_finite() {
        1.0 / mse
    } else {
        0.0
    }
}

/// Child with `parent1`'s genes before `cut` and `parent2`'s from `cut` on.
pub fn crossover_at(parent1: &Chromosome, parent2: &Chromosome, cut: usize) -> Chromosome {
    std::array::from_fn(|i| if i < cut { parent1[i] } else { parent2[i] })
}

/// Single-point crossover with the cut drawn from `1..PARAMETER_COUNT`.
pub fn crossover<R: Rng + ?Sized>(
    parent1: &Chromosome,
    parent2: &Chromosome,
    rng: &mut R,
) -> Chromosome {
    let cut = rng.gen_range(1..PARAMETER_COUNT);
    crossover_at(parent1, parent2, cut)
}

/// Adds a fresh random gene to each gene with probability `rate`.
///
/// Adding rather than replacing lets exponents drift outside `(-1, 1)`.
pub fn mutate<R: Rng + ?Sized>(chromosome: Chromosome, rate: f64, rng: &mut R) -> Chromosome {
    chromosome.map(|gene| {
        if rng.gen::<f64>() < rate {
            gene + random_gene(rng)
        } else {
            gene
        }
    })
}

/// Fitness-proportionate parent selection.
enum Roulette {
    Weighted(WeightedIndex<f64>),
    Uniform(usize),
}

impl Roulette {
    fn new(scores: &[f64]) -> Self {
        let mut weights: Vec<f64> = if scores.iter().any(|s| s.is_infinite()) {
            warn!("zero-error chromosome in population, selecting among perfect fits");
            scores
                .iter()
                .map(|s| if s.is_infinite() { 1.0 } else { 0.0 })
                .collect()
        } else {
            scores.to_vec()
        };

        // Large finite fitnesses can overflow the cumulative sum.
        if !weights.iter().sum::<f64>().is_finite() {
            let max = weights.iter().copied().fold(0.0, f64::max);
            for w in &mut weights {
                *w /= max;
            }
        }

        match WeightedIndex::new(&weights) {
            Ok(index) => Roulette::Weighted(index),
            Err(err) => {
                debug!("falling back to uniform selection: {}", err);
                Roulette::Uniform(scores.len())
            }
        }
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        match self {
            Roulette::Weighted(index) => index.sample(rng),
            Roulette::Uniform(len) => rng.gen_range(0..*len),
        }
    }
}

fn score(population: &[Chromosome], dataset: &[Example]) -> Vec<f64> {
    population
        .par_iter()
        .map(|chromosome| fitness(chromosome, dataset))
        .collect()
}

fn fittest(population: &[Chromosome], scores: &[f64]) -> (Chromosome, f64) {
    population
        .iter()
        .zip(scores)
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(c, &s)| (*c, s))
        .unwrap_or(([0.0; PARAMETER_COUNT], 0.0))
}

/// Run the search with a generator seeded from `config.seed`.
pub fn fit_genetic(dataset: &[Example], config: &GeneticConfig) -> Result<GeneticFit> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    fit_genetic_with_rng(dataset, config, &mut rng)
}

/// Run the search drawing all randomness from `rng`.
///
/// A population size of zero is treated as one.
pub fn fit_genetic_with_rng<R: Rng + ?Sized>(
    dataset: &[Example],
    config: &GeneticConfig,
    rng: &mut R,
) -> Result<GeneticFit> {
    if dataset.is_empty() {
        return Err(CadenceError::EmptyDataset("genetic search needs examples"));
    }

    let size = config.population_size.max(1);
    let mut population = initial_population(size, rng);
    let mut best_fitness_trace = Vec::with_capacity(config.generations);

    for generation in 0..config.generations {
        let scores = score(&population, dataset);
        let (_, best) = fittest(&population, &scores);
        best_fitness_trace.push(best);
        debug!(generation, best, "genetic generation");

        let roulette = Roulette::new(&scores);
        population = (0..size)
            .map(|_| {
                let parent1 = &population[roulette.sample(rng)];
                let parent2 = &population[roulette.sample(rng)];
                mutate(crossover(parent1, parent2, rng), config.mutation_rate, rng)
            })
            .collect();
    }

    let scores = score(&population, dataset);
    let (best, best_fitness) = fittest(&population, &scores);
    let parameters = Parameters::from_array(best);

    info!(
        "genetic search finished after {} generations (fitness {:.6}): {}",
        config.generations, best_fitness, parameters
    );
    Ok(GeneticFit {
        parameters,
        best_fitness_trace,
    })
}
