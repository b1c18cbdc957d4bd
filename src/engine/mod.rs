mod assertions;
mod error;
mod models;
mod native;
mod newman;
mod printer;
mod request;

use std::path::PathBuf;

use anyhow::Result;

use crate::collection::Collection;
use crate::env::Environment;

pub use assertions::{script_checks, status_checks, ScriptCheck, StatusCheck};
pub use error::EngineError;
pub use models::{
    AssertionResult, Counter, Execution, Failure, FailureError, RunDetails, RunStats, RunSummary,
};
pub use native::NativeEngine;
pub use newman::{parse_newman_summary, NewmanEngine};
pub use printer::{print_execution, print_run_header, print_summary};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reporter {
    /// Human-readable console output
    Cli,
    /// Pretty JSON dump of the run summary
    Json(PathBuf),
}

/// Everything an engine needs for one run.
#[derive(Debug, Clone, Copy)]
pub struct RunRequest<'a> {
    pub collection: &'a Collection,
    pub environment: &'a Environment,
    pub reporters: &'a [Reporter],
}

impl RunRequest<'_> {
    pub fn reports_to_console(&self) -> bool {
        self.reporters.contains(&Reporter::Cli)
    }

    pub fn json_export(&self) -> Option<&std::path::Path> {
        self.reporters.iter().find_map(|reporter| match reporter {
            Reporter::Json(path) => Some(path.as_path()),
            Reporter::Cli => None,
        })
    }
}

/// Executes a prepared collection once and returns its summary. An `Err` means
/// the run could not happen at all; failed assertions live in the summary.
#[allow(async_fn_in_trait)]
pub trait CollectionEngine {
    fn name(&self) -> &'static str;

    async fn run(&self, request: RunRequest<'_>) -> Result<RunSummary>;
}
