//! Configuration loading for Cadence.
//!
//! Configuration is loaded from TOML files with environment variable overrides.

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::graph::DEFAULT_BUCKET_WIDTH;
use crate::optim::{GeneticConfig, GradientDescentConfig};

pub const DEFAULT_CONFIG_FILE: &str = "config.default.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CadenceConfig {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub gradient: GradientDescentConfig,

    #[serde(default)]
    pub genetic: GeneticConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Raw record file.
    #[serde(default = "default_source")]
    pub source: String,

    /// Derived dataset cache.
    #[serde(default = "default_cache")]
    pub cache: String,

    /// Bucket width in seconds.
    #[serde(default = "default_bucket_width")]
    pub bucket_width: u64,

    /// Size of the balanced training set.
    #[serde(default = "default_dataset_size")]
    pub dataset_size: usize,

    /// Seed for the balancing shuffle.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            cache: default_cache(),
            bucket_width: default_bucket_width(),
            dataset_size: default_dataset_size(),
            seed: default_seed(),
        }
    }
}

fn default_source() -> String {
    "data/opsahl-ucsocial/out.opsahl-ucsocial".to_string()
}

fn default_cache() -> String {
    "data/dataset.json".to_string()
}

fn default_bucket_width() -> u64 {
    DEFAULT_BUCKET_WIDTH
}

fn default_dataset_size() -> usize {
    10_000
}

fn default_seed() -> u64 {
    42
}

impl CadenceConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false))
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("CADENCE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
