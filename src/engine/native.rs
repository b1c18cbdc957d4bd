use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::collection::RequestRef;
use crate::env::EnvMap;

use super::{
    assertions::{script_checks, ScriptCheck},
    models::{AssertionResult, Execution, RunSummary},
    printer::{print_execution, print_run_header, print_summary},
    request::prepare_request,
    CollectionEngine, RunRequest,
};

/// Runs collection requests one after another with reqwest and evaluates the
/// status-code checks found in their test scripts. Any other assertion is
/// recorded as a failure instead of being skipped.
pub struct NativeEngine {
    client: Client,
}

impl NativeEngine {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(concat!("colrun/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("building HTTP client")?;
        Ok(Self { client })
    }

    async fn execute(&self, entry: &RequestRef<'_>, vars: &EnvMap) -> Execution {
        let mut execution = Execution {
            item: entry.display_path(),
            method: entry.request.method.to_ascii_uppercase(),
            url: entry.request.url.raw(),
            status: None,
            duration_ms: 0.0,
            response_bytes: None,
            assertions: Vec::new(),
            error: None,
        };

        let prepared = match prepare_request(&self.client, entry.request, vars).await {
            Ok(prepared) => prepared,
            Err(err) => {
                execution.error = Some(format!("{err:#}"));
                return execution;
            }
        };
        execution.method = prepared.method;
        execution.url = prepared.url;

        let start = Instant::now();
        let response = match prepared.builder.send().await {
            Ok(response) => response,
            Err(err) => {
                execution.duration_ms = start.elapsed().as_secs_f64() * 1000.0;
                execution.error = Some(err.to_string());
                return execution;
            }
        };
        let status = response.status().as_u16();
        let body = response.bytes().await;
        execution.duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        execution.status = Some(status);

        match body {
            Ok(bytes) => execution.response_bytes = Some(bytes.len()),
            Err(err) => {
                execution.error = Some(format!("reading response body: {err}"));
                return execution;
            }
        }

        execution.assertions = script_checks(&entry.item.test_script())
            .into_iter()
            .map(|check| match check {
                ScriptCheck::Status(check) => {
                    let passed = check.matches(status);
                    AssertionResult {
                        name: check.describe(),
                        passed,
                        message: (!passed).then(|| check.failure_message(status)),
                    }
                }
                ScriptCheck::Unsupported(name) => {
                    warn!(
                        item = %execution.item,
                        test = %name,
                        "assertion not evaluated by native engine"
                    );
                    AssertionResult {
                        message: Some(format!(
                            "unsupported assertion in {name:?}; run with --engine newman to evaluate it"
                        )),
                        name,
                        passed: false,
                    }
                }
            })
            .collect();

        debug!(
            item = %execution.item,
            status,
            assertions = execution.assertions.len(),
            "request executed"
        );
        execution
    }
}

impl CollectionEngine for NativeEngine {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn run(&self, request: RunRequest<'_>) -> Result<RunSummary> {
        let collection = request.collection;
        let console = request.reports_to_console();

        // environment values take precedence over collection variables
        let mut vars: EnvMap = collection.variables().into_iter().collect();
        vars.extend(request.environment.to_map());

        let entries = collection.requests();
        info!(
            collection = collection.name(),
            requests = entries.len(),
            "starting native run"
        );

        let mut summary = RunSummary::new(collection.name());
        if console {
            print_run_header(collection.name());
        }

        for entry in &entries {
            let execution = self.execute(entry, &vars).await;
            if console {
                print_execution(&execution);
            }
            summary.record(execution);
        }

        summary.finish();
        if console {
            print_summary(&summary);
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use crate::engine::Reporter;
    use crate::env::Environment;
    use httpmock::prelude::*;
    use serde_json::json;

    fn collection() -> Collection {
        serde_json::from_value(json!({
            "info": {"name": "native"},
            "variable": [{"key": "HOST", "value": "http://unused.invalid"}, {"key": "API", "value": "/api"}],
            "item": [
                {"name": "ping", "request": {"method": "GET", "url": "{{HOST}}{{API}}/ping"},
                 "event": [{"listen": "test", "script": {"exec": ["pm.response.to.have.status(200);"]}}]},
                {"name": "folder", "item": [
                    {"name": "create", "request": {"method": "POST", "url": "{{HOST}}{{API}}/items"},
                     "event": [{"listen": "test", "script": {"exec": ["pm.response.to.have.status(201);"]}}]}
                ]}
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn runs_requests_and_records_failed_checks() -> Result<()> {
        let server = MockServer::start_async().await;
        let ping = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/ping");
                then.status(200).body("pong");
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/items");
                then.status(500);
            })
            .await;

        let collection = collection();
        let environment = Environment::for_host(&server.base_url());
        let engine = NativeEngine::new(Some(Duration::from_secs(5)))?;

        let summary = engine
            .run(RunRequest {
                collection: &collection,
                environment: &environment,
                reporters: &[],
            })
            .await?;

        ping.assert_async().await;
        create.assert_async().await;
        assert_eq!(summary.run.executions.len(), 2);
        assert_eq!(summary.run.executions[0].response_bytes, Some(4));
        assert_eq!(summary.failure_count(), 1);
        assert_eq!(summary.run.failures[0].source, "folder / create");
        assert!(summary.run.failures[0]
            .error
            .message
            .contains("status code 201 but got 500"));
        Ok(())
    }

    #[tokio::test]
    async fn body_assertions_fail_instead_of_passing_silently() -> Result<()> {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/packages");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"packages":[]}"#);
            })
            .await;
        let collection: Collection = serde_json::from_value(json!({
            "item": [{
                "name": "list",
                "request": {"method": "GET", "url": "{{HOST}}/packages"},
                "event": [{"listen": "test", "script": {"exec": [
                    "pm.test(\"Status code is 200\", function () { pm.response.to.have.status(200); });",
                    "pm.test(\"has one package\", function () {",
                    "    pm.expect(pm.response.json().packages.length).to.eql(1);",
                    "});"
                ]}}]
            }]
        }))?;
        let environment = Environment::for_host(&server.base_url());
        let engine = NativeEngine::new(Some(Duration::from_secs(5)))?;

        let summary = engine
            .run(RunRequest {
                collection: &collection,
                environment: &environment,
                reporters: &[],
            })
            .await?;

        let assertions = &summary.run.executions[0].assertions;
        assert_eq!(assertions.len(), 2);
        assert!(assertions[0].passed);
        assert!(!assertions[1].passed);
        assert_eq!(summary.failure_count(), 1);
        assert_eq!(
            summary.run.failures[0].error.test.as_deref(),
            Some("has one package")
        );
        assert!(summary.run.failures[0]
            .error
            .message
            .contains("--engine newman"));
        Ok(())
    }

    #[tokio::test]
    async fn transport_errors_become_failures() -> Result<()> {
        let collection: Collection = serde_json::from_value(json!({
            "item": [{"name": "down", "request": {"method": "GET", "url": "{{HOST}}/x"}}]
        }))?;
        let port = std::net::TcpListener::bind("127.0.0.1:0")?.local_addr()?.port();
        let environment = Environment::for_host(&format!("http://127.0.0.1:{port}"));
        let engine = NativeEngine::new(Some(Duration::from_secs(2)))?;

        let summary = engine
            .run(RunRequest {
                collection: &collection,
                environment: &environment,
                reporters: &[Reporter::Cli],
            })
            .await?;

        assert_eq!(summary.failure_count(), 1);
        assert_eq!(summary.run.stats.requests.failed, 1);
        assert_eq!(summary.run.failures[0].error.name, "Error");
        Ok(())
    }
}
