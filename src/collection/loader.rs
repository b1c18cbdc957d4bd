use std::{fs, path::Path};

use anyhow::{Context, Result};

use super::model::Collection;

pub fn load_collection(path: &Path) -> Result<Collection> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading collection {}", path.display()))?;
    let collection: Collection = serde_json::from_str(&contents)
        .with_context(|| format!("parsing collection {}", path.display()))?;
    Ok(collection)
}
