//! Cadence CLI - fit activity dynamics from an interaction record file.

use anyhow::Result;
use cadence::config::CadenceConfig;
use cadence::dataset::{self, Dataset};
use cadence::graph::{InteractionGraph, TsvEdgeFile};
use cadence::optim::{Genetic, GeneticConfig, GradientDescent, GradientDescentConfig, Optimizer};
use cadence::store;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Fit activity-rate dynamics on a temporal interaction graph")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(long, default_value = "cadence.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Build (or load) the cached dataset and report its size
    BuildDataset,

    /// Fit with batch gradient descent
    Gradient {
        /// Number of iterations
        #[arg(short, long)]
        iterations: Option<usize>,

        /// Learning rate
        #[arg(short, long)]
        learning_rate: Option<f64>,
    },

    /// Fit with a genetic search
    Genetic {
        /// Population size
        #[arg(short, long)]
        population: Option<usize>,

        /// Number of generations
        #[arg(short, long)]
        generations: Option<usize>,

        /// Per-gene mutation probability
        #[arg(short, long)]
        mutation_rate: Option<f64>,

        /// Seed for the search
        #[arg(short = 'S', long)]
        seed: Option<u64>,
    },
}

fn load_dataset(config: &CadenceConfig) -> Result<Dataset> {
    let source = TsvEdgeFile::new(&config.data.source);
    let dataset = store::load_or_build(Path::new(&config.data.cache), || {
        let graph = InteractionGraph::build(&source, config.data.bucket_width)?;
        dataset::from_graph(&graph)
    })?;
    Ok(dataset)
}

fn balanced(config: &CadenceConfig) -> Result<Dataset> {
    let full = load_dataset(config)?;
    let mut rng = StdRng::seed_from_u64(config.data.seed);
    Ok(dataset::balance(&full, config.data.dataset_size, &mut rng))
}

fn run(optimizer: &dyn Optimizer, config: &CadenceConfig) -> Result<()> {
    let dataset = balanced(config)?;
    println!("Fitting {} on {} examples...", optimizer.name(), dataset.len());

    let params = optimizer.fit(&dataset)?;
    println!("  mse {:.6}", params.mse(&dataset));
    println!("{}", params);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cadence=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = CadenceConfig::load(&cli.config)?;

    match cli.command {
        Commands::BuildDataset => {
            let dataset = load_dataset(&config)?;
            let active = dataset
                .iter()
                .filter(|e| e.feature.has_active_neighbor())
                .count();
            println!("{} examples ({} with active neighbors)", dataset.len(), active);
            println!("Cached at {}", config.data.cache);
        }

        Commands::Gradient {
            iterations,
            learning_rate,
        } => {
            let gd = GradientDescentConfig {
                iterations: iterations.unwrap_or(config.gradient.iterations),
                learning_rate: learning_rate.unwrap_or(config.gradient.learning_rate),
            };
            println!(
                "Gradient descent: {} iterations at rate {}",
                gd.iterations, gd.learning_rate
            );
            run(&GradientDescent::new(gd), &config)?;
        }

        Commands::Genetic {
            population,
            generations,
            mutation_rate,
            seed,
        } => {
            let ga = GeneticConfig {
                population_size: population.unwrap_or(config.genetic.population_size),
                generations: generations.unwrap_or(config.genetic.generations),
                mutation_rate: mutation_rate.unwrap_or(config.genetic.mutation_rate),
                seed: seed.unwrap_or(config.genetic.seed),
            };
            println!(
                "Genetic search: {} chromosomes x {} generations, mutation rate {}",
                ga.population_size, ga.generations, ga.mutation_rate
            );
            run(&Genetic::new(ga), &config)?;
        }
    }

    Ok(())
}
