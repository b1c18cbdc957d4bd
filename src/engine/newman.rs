use std::{io::ErrorKind, path::Path, process::Stdio, time::Duration};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, info};

use crate::collection::RequestUrl;

use super::{
    error::EngineError,
    models::{
        AssertionResult, Counter, Execution, Failure, FailureError, RunDetails, RunStats,
        RunSummary,
    },
    CollectionEngine, RunRequest,
};

/// Delegates the run to the `newman` CLI and reads back its JSON report.
pub struct NewmanEngine {
    bin: String,
    timeout: Option<Duration>,
}

impl NewmanEngine {
    pub fn new(bin: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }

    fn command(&self, request: &RunRequest<'_>, dir: &Path) -> Command {
        let reporters = if request.reports_to_console() {
            "cli,json"
        } else {
            "json"
        };

        let mut cmd = Command::new(&self.bin);
        cmd.arg("run")
            .arg(dir.join("collection.json"))
            .arg("--environment")
            .arg(dir.join("environment.json"))
            .arg("--reporters")
            .arg(reporters)
            .arg("--reporter-json-export")
            .arg(dir.join("summary.json"))
            .stdin(Stdio::null());
        if let Some(timeout) = self.timeout {
            cmd.arg("--timeout-request").arg(timeout.as_millis().to_string());
        }
        cmd
    }
}

impl CollectionEngine for NewmanEngine {
    fn name(&self) -> &'static str {
        "newman"
    }

    async fn run(&self, request: RunRequest<'_>) -> Result<RunSummary> {
        let workdir = tempfile::tempdir().context("creating newman work directory")?;
        let dir = workdir.path();

        stage_inputs(dir, &request).await?;

        info!(bin = %self.bin, "starting newman run");
        let status = self
            .command(&request, dir)
            .status()
            .await
            .map_err(|source| match source.kind() {
                ErrorKind::NotFound => EngineError::BinaryNotFound {
                    bin: self.bin.clone(),
                },
                _ => EngineError::Spawn {
                    bin: self.bin.clone(),
                    source,
                },
            })?;
        debug!(%status, "newman exited");

        let export = dir.join("summary.json");
        if !tokio::fs::try_exists(&export).await.unwrap_or(false) {
            return Err(EngineError::MissingSummary {
                status: status.to_string(),
            }
            .into());
        }

        let raw = tokio::fs::read_to_string(&export)
            .await
            .with_context(|| format!("reading newman summary {}", export.display()))?;
        parse_newman_summary(&raw)
    }
}

/// Writes the prepared collection and environment where `newman run` expects them.
async fn stage_inputs(dir: &Path, request: &RunRequest<'_>) -> Result<()> {
    let collection =
        serde_json::to_string_pretty(request.collection).context("serializing collection")?;
    tokio::fs::write(dir.join("collection.json"), collection)
        .await
        .context("writing collection file")?;

    let environment =
        serde_json::to_string_pretty(request.environment).context("serializing environment")?;
    tokio::fs::write(dir.join("environment.json"), environment)
        .await
        .context("writing environment file")?;
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewmanExport {
    collection: NewmanCollection,
    run: NewmanRun,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewmanCollection {
    info: NewmanNamed,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewmanNamed {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewmanRun {
    stats: NewmanStats,
    executions: Vec<NewmanExecution>,
    failures: Vec<NewmanFailure>,
    timings: NewmanTimings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewmanStats {
    requests: NewmanCounter,
    assertions: NewmanCounter,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewmanCounter {
    total: usize,
    failed: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewmanExecution {
    item: NewmanNamed,
    request: NewmanRequest,
    response: Option<NewmanResponse>,
    assertions: Vec<NewmanAssertion>,
    #[serde(rename = "requestError")]
    request_error: Option<NewmanError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewmanRequest {
    method: Option<String>,
    url: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewmanResponse {
    code: Option<u16>,
    #[serde(rename = "responseTime")]
    response_time: Option<f64>,
    #[serde(rename = "responseSize")]
    response_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewmanAssertion {
    assertion: String,
    error: Option<NewmanError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewmanFailure {
    error: NewmanError,
    source: Option<NewmanNamed>,
    at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewmanError {
    name: Option<String>,
    test: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewmanTimings {
    started: Option<i64>,
    completed: Option<i64>,
}

/// Converts newman's `--reporter-json-export` document into a [`RunSummary`].
pub fn parse_newman_summary(raw: &str) -> Result<RunSummary> {
    let export: NewmanExport = serde_json::from_str(raw).context("parsing newman summary")?;
    let run = export.run;

    let executions = run
        .executions
        .into_iter()
        .map(|execution| {
            let url = execution
                .request
                .url
                .and_then(|value| serde_json::from_value::<RequestUrl>(value).ok())
                .map(|url| url.raw())
                .unwrap_or_default();
            Execution {
                item: execution.item.name.unwrap_or_default(),
                method: execution.request.method.unwrap_or_default(),
                url,
                status: execution.response.as_ref().and_then(|r| r.code),
                duration_ms: execution
                    .response
                    .as_ref()
                    .and_then(|r| r.response_time)
                    .unwrap_or_default(),
                response_bytes: execution.response.as_ref().and_then(|r| r.response_size),
                assertions: execution
                    .assertions
                    .into_iter()
                    .map(|assertion| AssertionResult {
                        passed: assertion.error.is_none(),
                        message: assertion.error.and_then(|e| e.message),
                        name: assertion.assertion,
                    })
                    .collect(),
                error: execution.request_error.and_then(|e| e.message),
            }
        })
        .collect();

    let failures = run
        .failures
        .into_iter()
        .map(|failure| Failure {
            source: failure
                .source
                .and_then(|s| s.name)
                .unwrap_or_else(|| "<unknown>".to_string()),
            at: failure.at.unwrap_or_default(),
            error: FailureError {
                name: failure.error.name.unwrap_or_else(|| "Error".to_string()),
                test: failure.error.test,
                message: failure.error.message.unwrap_or_default(),
            },
        })
        .collect();

    let started = run
        .timings
        .started
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_else(Utc::now);
    let completed = run
        .timings
        .completed
        .and_then(DateTime::<Utc>::from_timestamp_millis);

    Ok(RunSummary {
        collection: export.collection.info.name.unwrap_or_default(),
        run: RunDetails {
            stats: RunStats {
                requests: Counter {
                    total: run.stats.requests.total,
                    failed: run.stats.requests.failed,
                },
                assertions: Counter {
                    total: run.stats.assertions.total,
                    failed: run.stats.assertions.failed,
                },
            },
            executions,
            failures,
            started,
            completed,
        },
    })
}
