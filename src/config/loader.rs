use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use super::settings::EngineKind;

pub const CONFIG_FILE_NAME: &str = "colrun.json";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ColrunConfig {
    pub collection: Option<String>,
    pub fixture: Option<String>,
    #[serde(rename = "defaultPort")]
    pub default_port: Option<String>,
    pub engine: Option<EngineKind>,
    #[serde(rename = "newmanBin")]
    pub newman_bin: Option<String>,
    #[serde(rename = "timeoutMs")]
    pub timeout_ms: Option<u64>,
    #[serde(rename = "envFile")]
    pub env_file: Option<String>,
    pub variables: HashMap<String, String>,
    #[serde(flatten)]
    pub extras: HashMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ColrunConfig,
    pub path: PathBuf,
    pub dir: PathBuf,
}

impl LoadedConfig {
    pub fn resolve(&self, value: &str) -> PathBuf {
        let candidate = Path::new(value);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.dir.join(candidate)
        }
    }
}

pub fn load_config(target: &Path) -> Result<Option<LoadedConfig>> {
    let resolved = if target.is_absolute() {
        target.to_path_buf()
    } else {
        std::env::current_dir()?.join(target)
    };

    let (file_path, dir) = if resolved.is_dir() {
        (resolved.join(CONFIG_FILE_NAME), resolved)
    } else {
        let dir = match resolved.parent() {
            Some(parent) => parent.to_path_buf(),
            None => std::env::current_dir()?,
        };
        (resolved, dir)
    };

    if !file_path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(&file_path)
        .with_context(|| format!("reading config {}", file_path.display()))?;

    let config: ColrunConfig = serde_json::from_str(&contents)
        .with_context(|| format!("parsing config {}", file_path.display()))?;

    Ok(Some(LoadedConfig {
        config,
        path: file_path,
        dir,
    }))
}

/// Like [`load_config`], for a path the user named explicitly: a missing file
/// is an error instead of "no config".
pub fn load_required_config(target: &Path) -> Result<LoadedConfig> {
    load_config(target)?.with_context(|| {
        format!(
            "config {} not found (a directory must contain {CONFIG_FILE_NAME})",
            target.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn returns_none_when_config_missing() -> Result<()> {
        let temp = tempdir()?;
        let result = load_config(temp.path())?;
        assert!(result.is_none());
        Ok(())
    }

    #[test]
    fn loads_config_from_directory() -> Result<()> {
        let temp = tempdir()?;
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &config_path,
            r#"{"collection":"api.json","engine":"newman","timeoutMs":5000,"variables":{"USER":"admin"}}"#,
        )?;

        let result = load_config(temp.path())?.expect("config should load");
        assert_eq!(result.path, config_path);
        assert_eq!(result.dir, temp.path());
        assert_eq!(result.config.collection.as_deref(), Some("api.json"));
        assert_eq!(result.config.engine, Some(EngineKind::Newman));
        assert_eq!(result.config.timeout_ms, Some(5000));
        assert_eq!(result.config.variables.get("USER"), Some(&"admin".to_string()));
        assert_eq!(result.resolve("api.json"), temp.path().join("api.json"));
        Ok(())
    }

    #[test]
    fn loads_config_from_explicit_file() -> Result<()> {
        let temp = tempdir()?;
        let config_path = temp.path().join("ci.json");
        std::fs::write(&config_path, r#"{"defaultPort":"4502"}"#)?;

        let result = load_config(&config_path)?.expect("config should load");
        assert_eq!(result.dir, temp.path());
        assert_eq!(result.config.default_port.as_deref(), Some("4502"));
        Ok(())
    }

    #[test]
    fn reports_malformed_config() -> Result<()> {
        let temp = tempdir()?;
        std::fs::write(temp.path().join(CONFIG_FILE_NAME), r#"{"engine":"curl"}"#)?;

        let err = load_config(temp.path()).unwrap_err();
        assert!(err.to_string().contains("parsing config"));
        Ok(())
    }

    #[test]
    fn explicit_config_must_exist() -> Result<()> {
        let temp = tempdir()?;
        let missing = temp.path().join("ci.json");

        let err = load_required_config(&missing).unwrap_err();
        assert!(err.to_string().contains("ci.json"));
        assert!(err.to_string().contains("not found"));

        let err = load_required_config(temp.path()).unwrap_err();
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
        Ok(())
    }

    #[test]
    fn explicit_config_loads_when_present() -> Result<()> {
        let temp = tempdir()?;
        let config_path = temp.path().join("ci.json");
        std::fs::write(&config_path, r#"{"engine":"native"}"#)?;

        let loaded = load_required_config(&config_path)?;
        assert_eq!(loaded.path, config_path);
        assert_eq!(loaded.config.engine, Some(EngineKind::Native));
        Ok(())
    }
}
