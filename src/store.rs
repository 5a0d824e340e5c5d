use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::collection::Collection;

/// Write the collection as pretty-printed UTF-8 JSON.
pub fn save(path: impl AsRef<Path>, collection: &Collection) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(collection)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Saved {} records to {}", collection.len(), path.display());
    Ok(())
}

pub fn load(path: impl AsRef<Path>) -> Result<Collection> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let collection: Collection = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    info!("Loaded {} records from {}", collection.len(), path.display());
    Ok(collection)
}
