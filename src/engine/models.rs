use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub collection: String,
    pub run: RunDetails,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunDetails {
    pub stats: RunStats,
    pub executions: Vec<Execution>,
    pub failures: Vec<Failure>,
    pub started: DateTime<Utc>,
    pub completed: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub requests: Counter,
    pub assertions: Counter,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counter {
    pub total: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Execution {
    pub item: String,
    pub method: String,
    pub url: String,
    pub status: Option<u16>,
    pub duration_ms: f64,
    pub response_bytes: Option<usize>,
    pub assertions: Vec<AssertionResult>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionResult {
    pub name: String,
    pub passed: bool,
    pub message: Option<String>,
}

/// One recorded failure, shaped after newman's `run.failures` entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub source: String,
    pub at: String,
    pub error: FailureError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureError {
    pub name: String,
    pub test: Option<String>,
    pub message: String,
}

impl RunSummary {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            run: RunDetails {
                stats: RunStats::default(),
                executions: Vec::new(),
                failures: Vec::new(),
                started: Utc::now(),
                completed: None,
            },
        }
    }

    pub fn failure_count(&self) -> usize {
        self.run.failures.len()
    }

    /// Adds an execution, updating counters and the failure list.
    pub fn record(&mut self, execution: Execution) {
        let stats = &mut self.run.stats;
        stats.requests.total += 1;

        if let Some(error) = &execution.error {
            stats.requests.failed += 1;
            self.run.failures.push(Failure {
                source: execution.item.clone(),
                at: "request".to_string(),
                error: FailureError {
                    name: "Error".to_string(),
                    test: None,
                    message: error.clone(),
                },
            });
        }

        for (index, assertion) in execution.assertions.iter().enumerate() {
            stats.assertions.total += 1;
            if assertion.passed {
                continue;
            }
            stats.assertions.failed += 1;
            self.run.failures.push(Failure {
                source: execution.item.clone(),
                at: format!("assertion:{index} in test-script"),
                error: FailureError {
                    name: "AssertionError".to_string(),
                    test: Some(assertion.name.clone()),
                    message: assertion.message.clone().unwrap_or_default(),
                },
            });
        }

        self.run.executions.push(execution);
    }

    pub fn finish(&mut self) {
        self.run.completed = Some(Utc::now());
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.run
            .completed
            .map(|completed| (completed - self.run.started).num_milliseconds())
    }
}
