use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::collection::{inject_fixture, load_collection, Collection};
use crate::config::{EngineKind, RunSettings};
use crate::engine::{CollectionEngine, NativeEngine, NewmanEngine, Reporter, RunRequest, RunSummary};
use crate::env::Environment;

/// Process exit status for a run with failing tests (`-1` as seen by the shell).
pub const FAILURE_EXIT_CODE: u8 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Passed,
    Failed { failures: usize },
}

impl RunOutcome {
    pub fn from_summary(summary: &RunSummary) -> Self {
        match summary.failure_count() {
            0 => RunOutcome::Passed,
            failures => RunOutcome::Failed { failures },
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::Passed => 0,
            RunOutcome::Failed { .. } => FAILURE_EXIT_CODE,
        }
    }

    pub fn message(&self) -> Option<String> {
        match self {
            RunOutcome::Passed => None,
            RunOutcome::Failed { failures } => {
                Some(format!("Failed with {failures} failing tests."))
            }
        }
    }
}

/// Loads the collection and points its uploads at the fixture package.
pub fn prepare_collection(collection_path: &Path, fixture: &Path) -> Result<Collection> {
    let mut collection = load_collection(collection_path)?;
    let report = inject_fixture(&mut collection, fixture);
    info!(
        collection = collection.name(),
        requests = report.requests_visited,
        uploads = report.rewritten(),
        "collection prepared"
    );
    Ok(collection)
}

/// Runs the engine exactly once. Engine errors propagate; test failures are
/// folded into the returned outcome.
pub async fn run_once<E: CollectionEngine>(
    engine: &E,
    request: RunRequest<'_>,
) -> Result<(RunSummary, RunOutcome)> {
    info!(engine = engine.name(), "running collection");
    let summary = engine
        .run(request)
        .await
        .with_context(|| format!("{} engine failed to run the collection", engine.name()))?;

    if let Some(path) = request.json_export() {
        write_summary(&summary, path)?;
    }

    let outcome = RunOutcome::from_summary(&summary);
    Ok((summary, outcome))
}

pub fn write_summary(summary: &RunSummary, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating report directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(summary).context("serializing run summary")?;
    std::fs::write(path, json)
        .with_context(|| format!("writing run summary to {}", path.display()))
}

/// Full pipeline: prepare, build the environment, run with the configured engine.
pub async fn execute(settings: &RunSettings) -> Result<RunOutcome> {
    let collection = prepare_collection(&settings.collection, &settings.fixture)?;
    let environment =
        Environment::for_host(&settings.base_url).with_variables(settings.variables.clone());

    let mut reporters = vec![Reporter::Cli];
    if let Some(path) = &settings.json_export {
        reporters.push(Reporter::Json(path.clone()));
    }

    let request = RunRequest {
        collection: &collection,
        environment: &environment,
        reporters: &reporters,
    };

    let (_, outcome) = match settings.engine {
        EngineKind::Native => run_once(&NativeEngine::new(settings.timeout)?, request).await?,
        EngineKind::Newman => {
            let engine = NewmanEngine::new(settings.newman_bin.clone(), settings.timeout);
            run_once(&engine, request).await?
        }
    };
    Ok(outcome)
}
