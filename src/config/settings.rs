use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Result;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::env::load_env_file_sync;

use super::{loader::LoadedConfig, target::resolve_base_url};

pub const DEFAULT_COLLECTION: &str = "filevault-packagemgr-tests.postman_collection.json";
pub const DEFAULT_FIXTURE: &str = "test-files/test-package.zip";
pub const DEFAULT_NEWMAN_BIN: &str = "newman";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Built-in HTTP engine
    #[default]
    Native,
    /// External `newman` CLI
    Newman,
}

/// Values given on the command line. Each one wins over the config file.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub port: Option<String>,
    pub collection: Option<PathBuf>,
    pub fixture: Option<PathBuf>,
    pub engine: Option<EngineKind>,
    pub newman_bin: Option<String>,
    pub timeout_ms: Option<u64>,
    pub env_file: Option<PathBuf>,
    pub json_export: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub base_url: String,
    pub collection: PathBuf,
    pub fixture: PathBuf,
    pub engine: EngineKind,
    pub newman_bin: String,
    pub timeout: Option<Duration>,
    pub variables: Vec<(String, String)>,
    pub json_export: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RunSettingsBuilder {
    base_dir: PathBuf,
    config: Option<LoadedConfig>,
    overrides: SettingsOverrides,
}

impl RunSettingsBuilder {
    pub fn new(base_dir: PathBuf, config: Option<LoadedConfig>, overrides: SettingsOverrides) -> Self {
        Self {
            base_dir,
            config,
            overrides,
        }
    }

    pub fn build(&self) -> Result<RunSettings> {
        let cfg = self.config.as_ref();
        let defaults_dir = cfg
            .map(|c| c.dir.clone())
            .unwrap_or_else(|| self.base_dir.clone());

        let port = self
            .overrides
            .port
            .as_deref()
            .or_else(|| cfg.and_then(|c| c.config.default_port.as_deref()));
        let base_url = resolve_base_url(port);

        let collection = self.pick_path(
            self.overrides.collection.as_deref(),
            cfg.and_then(|c| c.config.collection.as_deref()),
            &defaults_dir.join(DEFAULT_COLLECTION),
        );

        let fixture = self.pick_path(
            self.overrides.fixture.as_deref(),
            cfg.and_then(|c| c.config.fixture.as_deref()),
            &defaults_dir.join(DEFAULT_FIXTURE),
        );
        if !fixture.exists() {
            warn!("fixture package {} does not exist", fixture.display());
        }

        let engine = self
            .overrides
            .engine
            .or_else(|| cfg.and_then(|c| c.config.engine))
            .unwrap_or_default();

        let newman_bin = self
            .overrides
            .newman_bin
            .clone()
            .or_else(|| cfg.and_then(|c| c.config.newman_bin.clone()))
            .unwrap_or_else(|| DEFAULT_NEWMAN_BIN.to_string());

        let timeout = self
            .overrides
            .timeout_ms
            .or_else(|| cfg.and_then(|c| c.config.timeout_ms))
            .map(Duration::from_millis);

        let mut variables: Vec<(String, String)> = Vec::new();
        if let Some(cfg) = cfg {
            let mut from_config: Vec<_> = cfg
                .config
                .variables
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            from_config.sort();
            variables.extend(from_config);
        }

        let env_file = match &self.overrides.env_file {
            Some(explicit) => Some(resolve_relative(&self.base_dir, explicit)),
            None => cfg.and_then(|c| c.config.env_file.as_deref().map(|p| c.resolve(p))),
        };
        if let Some(path) = env_file {
            debug!("loading variables from {}", path.display());
            variables.extend(load_env_file_sync(&path)?);
        }

        let json_export = self
            .overrides
            .json_export
            .as_deref()
            .map(|p| resolve_relative(&self.base_dir, p));

        Ok(RunSettings {
            base_url,
            collection,
            fixture,
            engine,
            newman_bin,
            timeout,
            variables,
            json_export,
        })
    }

    fn pick_path(&self, explicit: Option<&Path>, configured: Option<&str>, fallback: &Path) -> PathBuf {
        if let Some(explicit) = explicit {
            return resolve_relative(&self.base_dir, explicit);
        }
        match (configured, &self.config) {
            (Some(value), Some(cfg)) => cfg.resolve(value),
            _ => fallback.to_path_buf(),
        }
    }
}

fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
