//! Staged run orchestration
//!
//! Stages run strictly in order: reset, fetch, execute, redact, merge,
//! generate, snapshot, deploy, notify. Each one is recorded as a
//! [`StageOutcome`] on the returned [`PipelineReport`].

use std::path::{Path, PathBuf};
use std::time::Instant;

use apirun_config::FailurePolicy;
use apirun_core::{Collection, Error, PipelineReport, Result, Stage, StageOutcome};
use apirun_security::{ArtifactFilter, ContentRedactor, Redactor, redact_artifacts};
use apirun_sources::CollectionSource;
use apirun_storage::HistoryStore;

use crate::deploy::Deployer;
use crate::notify::{Notification, Notifier};
use crate::report::{ReportContext, ReportGenerator};
use crate::runner::TestRunner;

/// Directory layout of one run
#[derive(Debug, Clone)]
pub struct PipelinePaths {
    /// Artifacts written by the runner, reset at the start of every run
    pub results_dir: PathBuf,
    pub report_dir: PathBuf,
    /// Scratch space for the collection and the runner summary
    pub work_dir: PathBuf,
}

impl PipelinePaths {
    pub fn collection_file(&self) -> PathBuf {
        self.work_dir.join("collection.json")
    }

    pub fn summary_file(&self) -> PathBuf {
        self.work_dir.join("newman-summary.json")
    }
}

pub struct Pipeline {
    source: Box<dyn CollectionSource>,
    runner: Box<dyn TestRunner>,
    redactor: Box<dyn ContentRedactor>,
    filter: ArtifactFilter,
    history: HistoryStore,
    generator: Box<dyn ReportGenerator>,
    deployer: Option<Box<dyn Deployer>>,
    notifier: Option<Box<dyn Notifier>>,
    paths: PipelinePaths,
    policy: FailurePolicy,
    title: String,
    report_url: Option<String>,
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

impl Pipeline {
    pub fn new(
        source: Box<dyn CollectionSource>,
        runner: Box<dyn TestRunner>,
        generator: Box<dyn ReportGenerator>,
        history: HistoryStore,
        paths: PipelinePaths,
    ) -> Self {
        Self {
            source,
            runner,
            redactor: Box::new(Redactor::new()),
            filter: ArtifactFilter::default(),
            history,
            generator,
            deployer: None,
            notifier: None,
            paths,
            policy: FailurePolicy::default(),
            title: "API test run".to_string(),
            report_url: None,
        }
    }

    pub fn with_redactor(
        mut self,
        redactor: Box<dyn ContentRedactor>,
        filter: ArtifactFilter,
    ) -> Self {
        self.redactor = redactor;
        self.filter = filter;
        self
    }

    pub fn with_deployer(mut self, deployer: Box<dyn Deployer>) -> Self {
        self.deployer = Some(deployer);
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Public URL of the report when it is hosted outside the deployer
    pub fn with_report_url(mut self, url: Option<String>) -> Self {
        self.report_url = url;
        self
    }

    pub fn paths(&self) -> &PipelinePaths {
        &self.paths
    }

    /// Execute every stage. Never returns early with an error: failures are
    /// recorded on the report and reflected in its exit code.
    pub async fn run(&self) -> PipelineReport {
        let mut report = PipelineReport::new();
        tracing::info!("Starting run {}", report.run_id);

        // Reset
        let started = Instant::now();
        if let Err(e) = self.reset_working_set().await {
            return abort(report, Stage::ResetWorkingSet, e, started);
        }
        report.record(StageOutcome::passed(
            Stage::ResetWorkingSet,
            elapsed_ms(started),
        ));

        // Fetch
        let started = Instant::now();
        tracing::info!("Fetching {}", self.source.describe());
        let collection = match self.source.fetch().await {
            Ok(collection) => collection,
            Err(e) => return abort(report, Stage::FetchCollection, e, started),
        };
        tracing::info!(
            "Fetched collection {} with {} request(s)",
            collection.name().unwrap_or("(unnamed)"),
            collection.request_count()
        );
        report.record(StageOutcome::passed(
            Stage::FetchCollection,
            elapsed_ms(started),
        ));

        // Execute
        let started = Instant::now();
        let collection_file = self.paths.collection_file();
        if let Err(e) =
            write_collection(&self.paths.work_dir, &collection_file, &collection).await
        {
            let err = Error::Execution(format!("failed to stage collection: {}", e));
            return abort(report, Stage::Execute, err, started);
        }
        let summary = match self.runner.run(&collection_file, &self.paths.results_dir).await {
            Ok(summary) => summary,
            Err(e) => return abort(report, Stage::Execute, e, started),
        };
        tracing::info!(
            "Executed {} request(s), {}/{} assertion(s) passed",
            summary.requests.total,
            summary.assertions.passed(),
            summary.assertions.total
        );
        report.summary = Some(summary);
        report.record(StageOutcome::passed(Stage::Execute, elapsed_ms(started)));

        // Redact, before anything reads or publishes the artifacts
        let started = Instant::now();
        match redact_artifacts(&self.paths.results_dir, &self.filter, self.redactor.as_ref()) {
            Ok(redactions) => {
                if redactions.total() > 0 {
                    tracing::info!(
                        "Redacted {} value(s) in {} artifact(s)",
                        redactions.total(),
                        redactions.files_changed
                    );
                }
                report.record(StageOutcome::passed(Stage::Redact, elapsed_ms(started)));
            }
            Err(e) => {
                let err = Error::Redaction(e.to_string());
                return abort(report, Stage::Redact, err, started);
            }
        }

        // Merge. After a failure the stored window must stay as it was.
        let started = Instant::now();
        let merged = match self.history.merge_window(&self.paths.results_dir) {
            Ok(_) => {
                report.record(StageOutcome::passed(Stage::MergeHistory, elapsed_ms(started)));
                true
            }
            Err(e) => {
                let err = Error::History(e.to_string());
                if self.policy == FailurePolicy::FailFast {
                    return abort(report, Stage::MergeHistory, err, started);
                }
                tracing::error!("History merge failed, report will have no trend: {}", err);
                report.abort(err.to_string());
                report.record(StageOutcome::failed(
                    Stage::MergeHistory,
                    err.to_string(),
                    elapsed_ms(started),
                ));
                false
            }
        };

        // Generate
        let started = Instant::now();
        let context = ReportContext {
            run_id: report.run_id.clone(),
            collection_name: collection.name().map(str::to_string),
            report_url: self.report_url.clone(),
        };
        let generated = match self
            .generator
            .generate(&self.paths.results_dir, &self.paths.report_dir, &context)
            .await
        {
            Ok(()) => {
                report.record(StageOutcome::passed(Stage::GenerateReport, elapsed_ms(started)));
                true
            }
            Err(e) if self.policy == FailurePolicy::FailFast => {
                return abort(report, Stage::GenerateReport, e, started);
            }
            Err(e) => {
                tracing::warn!("{}", e);
                report.record(StageOutcome::failed(
                    Stage::GenerateReport,
                    e.to_string(),
                    elapsed_ms(started),
                ));
                false
            }
        };

        // Snapshot, only from a report that was actually generated
        let started = Instant::now();
        if !merged {
            report.record(StageOutcome::skipped(
                Stage::SnapshotHistory,
                "history merge failed",
            ));
        } else if !generated {
            report.record(StageOutcome::skipped(
                Stage::SnapshotHistory,
                "report generation failed",
            ));
        } else {
            match self.history.snapshot_current_run(&self.paths.report_dir) {
                Ok(Some(entry)) => {
                    tracing::debug!("History entry {} stored", entry.id);
                    report.record(StageOutcome::passed(
                        Stage::SnapshotHistory,
                        elapsed_ms(started),
                    ));
                }
                Ok(None) => {
                    report.record(StageOutcome::skipped(
                        Stage::SnapshotHistory,
                        "report produced no history",
                    ));
                }
                Err(e) => {
                    let err = Error::History(e.to_string());
                    if self.policy == FailurePolicy::FailFast {
                        return abort(report, Stage::SnapshotHistory, err, started);
                    }
                    tracing::error!("{}", err);
                    report.abort(err.to_string());
                    report.record(StageOutcome::failed(
                        Stage::SnapshotHistory,
                        err.to_string(),
                        elapsed_ms(started),
                    ));
                }
            }
        }

        // Deploy
        let started = Instant::now();
        let deployed = match &self.deployer {
            None => {
                report.record(StageOutcome::skipped(Stage::Deploy, "no deploy target"));
                false
            }
            Some(_) if !self.paths.report_dir.is_dir() => {
                report.record(StageOutcome::skipped(Stage::Deploy, "no report to publish"));
                false
            }
            Some(deployer) => match deployer.deploy(&self.paths.report_dir).await {
                Ok(url) => {
                    report.report_url = Some(url);
                    report.record(StageOutcome::passed(Stage::Deploy, elapsed_ms(started)));
                    true
                }
                Err(e) if self.policy == FailurePolicy::FailFast => {
                    return abort(report, Stage::Deploy, e, started);
                }
                Err(e) => {
                    tracing::warn!("{} deploy failed: {}", deployer.target(), e);
                    report.record(StageOutcome::failed(
                        Stage::Deploy,
                        e.to_string(),
                        elapsed_ms(started),
                    ));
                    false
                }
            },
        };

        // Notify
        let started = Instant::now();
        match &self.notifier {
            None => report.record(StageOutcome::skipped(Stage::Notify, "no notifier configured")),
            Some(_) if !deployed => {
                report.record(StageOutcome::skipped(Stage::Notify, "report was not published"))
            }
            Some(notifier) => {
                let notification = Notification {
                    title: self.title.clone(),
                    summary: report.summary.clone().unwrap_or_default(),
                    report_url: self.report_url.clone().or_else(|| report.report_url.clone()),
                };
                match notifier.notify(&notification).await {
                    Ok(()) => {
                        report.record(StageOutcome::passed(Stage::Notify, elapsed_ms(started)))
                    }
                    Err(e) => {
                        tracing::warn!("{}", e);
                        report.record(StageOutcome::failed(
                            Stage::Notify,
                            e.to_string(),
                            elapsed_ms(started),
                        ));
                    }
                }
            }
        }

        finish(report)
    }

    /// Clear the results directory (keeping its history) and drop any report
    /// left by an earlier run, so only this run's output can be published.
    async fn reset_working_set(&self) -> Result<()> {
        self.history
            .reset_working_set(&self.paths.results_dir)
            .map_err(|e| Error::History(e.to_string()))?;

        let report_dir = &self.paths.report_dir;
        if report_dir.exists() {
            tokio::fs::remove_dir_all(report_dir).await?;
            tracing::debug!("Removed stale report at {}", report_dir.display());
        }
        Ok(())
    }
}

async fn write_collection(
    work_dir: &Path,
    path: &Path,
    collection: &Collection,
) -> Result<()> {
    tokio::fs::create_dir_all(work_dir).await?;
    tokio::fs::write(path, collection.to_json_pretty()?).await?;
    Ok(())
}

/// Record `stage` as failed, skip everything after it and fail the run.
fn abort(mut report: PipelineReport, stage: Stage, err: Error, started: Instant) -> PipelineReport {
    tracing::error!("{} failed: {}", stage, err);

    let reason = err.to_string();
    report.record(StageOutcome::failed(stage, reason.clone(), elapsed_ms(started)));
    for skipped in stage.following() {
        report.record(StageOutcome::skipped(skipped, format!("run aborted at {}", stage)));
    }
    report.abort(reason);

    finish(report)
}

fn finish(report: PipelineReport) -> PipelineReport {
    tracing::info!(
        "Run {} finished: {} stage(s) passed, {} failed, exit code {}",
        report.run_id,
        report.passed_count(),
        report.failed_count(),
        report.exit_code()
    );
    report
}
