use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::Parser;
use colrun::config::{
    load_config, load_required_config, EngineKind, RunSettingsBuilder, SettingsOverrides,
};
use colrun::driver::execute;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "colrun",
    version,
    about = "Collection-driven API test runner",
    disable_help_subcommand = true
)]
struct Cli {
    /// Port of the server under test (defaults to 8080)
    #[arg(value_name = "PORT")]
    port: Option<String>,

    /// Collection file to run
    #[arg(long)]
    collection: Option<PathBuf>,

    /// Package file uploaded by the collection's upload requests
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Directory or file containing colrun.json
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override base directory used for resolving paths
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Engine that executes the collection
    #[arg(long, value_enum)]
    engine: Option<EngineKind>,

    /// Extra environment variables for the run (dotenv format)
    #[arg(short, long = "env-file")]
    env_file: Option<PathBuf>,

    /// Write the run summary as JSON to this file
    #[arg(long = "reporter-json-export", value_name = "PATH")]
    json_export: Option<PathBuf>,

    /// Per-request timeout in milliseconds
    #[arg(long = "timeout-ms")]
    timeout_ms: Option<u64>,

    /// newman executable used by the newman engine
    #[arg(long = "newman-bin")]
    newman_bin: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_logging();
    let cli = Cli::parse();

    let base_dir = match &cli.cwd {
        Some(dir) => resolve_path(dir)?,
        None => std::env::current_dir()?,
    };

    let cfg = match &cli.config {
        Some(path) => Some(
            load_required_config(&resolve_relative(&base_dir, path))
                .context("loading configuration")?,
        ),
        None => load_config(&base_dir).context("loading configuration")?,
    };

    let settings = RunSettingsBuilder::new(
        base_dir,
        cfg,
        SettingsOverrides {
            port: cli.port,
            collection: cli.collection,
            fixture: cli.fixture,
            engine: cli.engine,
            newman_bin: cli.newman_bin,
            timeout_ms: cli.timeout_ms,
            env_file: cli.env_file,
            json_export: cli.json_export,
        },
    )
    .build()?;
    tracing::debug!(?settings, "resolved run settings");

    let outcome = execute(&settings).await?;
    if let Some(message) = outcome.message() {
        println!("{message}");
    }
    Ok(ExitCode::from(outcome.exit_code()))
}

fn init_logging() {
    let default_level = "warn";
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn resolve_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
