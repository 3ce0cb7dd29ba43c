//! On-disk dataset cache.
//!
//! The cache is keyed only by its path: if the file exists it is trusted.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::dataset::Dataset;
use crate::error::Result;

pub fn load(path: &Path) -> Result<Dataset> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

pub fn save(path: &Path, dataset: &Dataset) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string(dataset)?)?;
    Ok(())
}

/// Load the cached dataset, or build and cache it.
pub fn load_or_build<F>(path: &Path, build: F) -> Result<Dataset>
where
    F: FnOnce() -> Result<Dataset>,
{
    if path.exists() {
        let dataset = load(path)?;
        info!("loaded {} cached examples from {}", dataset.len(), path.display());
        return Ok(dataset);
    }

    let dataset = build()?;
    save(path, &dataset)?;
    info!("cached {} examples to {}", dataset.len(), path.display());
    Ok(dataset)
}
