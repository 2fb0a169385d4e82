//! Collection execution

use std::path::{Path, PathBuf};

use apirun_core::{Error, Result, RunSummary};
use async_trait::async_trait;
use serde::Deserialize;

use crate::process::{CommandSpec, run_command};

#[async_trait]
pub trait TestRunner: Send + Sync {
    /// Run `collection` and write result artifacts into `results_dir`.
    ///
    /// Failed assertions are part of the summary, not an error. `Err` means
    /// the runner itself could not run or report.
    async fn run(&self, collection: &Path, results_dir: &Path) -> Result<RunSummary>;
}

/// newman with the json and allure reporters
pub struct NewmanRunner {
    command: String,
    extra_args: Vec<String>,
    summary_path: PathBuf,
}

impl NewmanRunner {
    pub fn new(command: impl Into<String>, summary_path: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            extra_args: Vec::new(),
            summary_path: summary_path.into(),
        }
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    fn command_spec(&self, collection: &Path, results_dir: &Path) -> CommandSpec {
        CommandSpec::new(&self.command)
            .arg("run")
            .path_arg(collection)
            .args(["--reporters", "cli,json,allure", "--reporter-json-export"])
            .path_arg(&self.summary_path)
            .arg("--reporter-allure-export")
            .path_arg(results_dir)
            .args(self.extra_args.iter().cloned())
    }
}

#[async_trait]
impl TestRunner for NewmanRunner {
    async fn run(&self, collection: &Path, results_dir: &Path) -> Result<RunSummary> {
        // A summary left over from an earlier run must not be mistaken for this one
        match tokio::fs::remove_file(&self.summary_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let spec = self.command_spec(collection, results_dir);
        let output = run_command(&spec).await.map_err(|e| {
            Error::Execution(format!("failed to start {}: {}", self.command, e))
        })?;

        let summary = match tokio::fs::read_to_string(&self.summary_path).await {
            Ok(content) => parse_summary(&content)?,
            Err(_) => {
                return Err(Error::Execution(format!(
                    "{} exited with {} without writing a summary: {}",
                    self.command,
                    output.exit_code,
                    output.tail(5)
                )));
            }
        };

        if !output.success() {
            tracing::debug!(
                "{} exited with {} ({} failed assertion(s))",
                self.command,
                output.exit_code,
                summary.assertions.failed
            );
        }

        Ok(summary)
    }
}

#[derive(Deserialize)]
struct NewmanExport {
    run: NewmanRun,
}

#[derive(Deserialize)]
struct NewmanRun {
    stats: RunSummary,
}

/// Read request and assertion counts from a newman JSON export.
pub fn parse_summary(content: &str) -> Result<RunSummary> {
    let export: NewmanExport = serde_json::from_str(content)
        .map_err(|e| Error::Execution(format!("unreadable run summary: {}", e)))?;
    Ok(export.run.stats)
}
