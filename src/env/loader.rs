use std::{fs, io::Cursor, path::Path};

use anyhow::{Context, Result};

/// Reads a dotenv file, keeping the order in which keys appear.
pub fn load_env_file_sync(path: &Path) -> Result<Vec<(String, String)>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading env file {}", path.display()))?;
    let iter = dotenvy::from_read_iter(Cursor::new(content));

    let mut values = Vec::new();
    for item in iter {
        let (key, value) = item.with_context(|| format!("parsing env file {}", path.display()))?;
        values.push((key, value));
    }

    Ok(values)
}
