use std::path::Path;
use std::sync::{Arc, Mutex};

use apirun_config::FailurePolicy;
use apirun_core::{Collection, Error, Result, RunSummary, Stage, StageStatus, StatCounter};
use apirun_engine::{
    Deployer, Notification, Notifier, Pipeline, PipelinePaths, ReportContext, ReportGenerator,
    TestRunner,
};
use apirun_sources::CollectionSource;
use apirun_storage::HistoryStore;
use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;

const SECRET: &str = "Bearer abc123def456ghi789";

struct FakeSource {
    fail: bool,
}

#[async_trait]
impl CollectionSource for FakeSource {
    async fn fetch(&self) -> Result<Collection> {
        if self.fail {
            return Err(Error::Fetch("HTTP 401".to_string()));
        }
        Collection::from_document(json!({
            "info": {"name": "Orders API"},
            "item": [
                {"name": "list", "request": {"method": "GET"}},
                {"name": "create", "request": {"method": "POST"}}
            ]
        }))
    }

    fn describe(&self) -> String {
        "fake collection".to_string()
    }
}

/// Writes one result artifact carrying a bearer token
struct FakeRunner {
    failed_assertions: u64,
    calls: Arc<Mutex<usize>>,
    write_binary: bool,
}

#[async_trait]
impl TestRunner for FakeRunner {
    async fn run(&self, collection: &Path, results_dir: &Path) -> Result<RunSummary> {
        *self.calls.lock().unwrap() += 1;
        assert!(collection.exists());

        std::fs::create_dir_all(results_dir)?;
        let outcome = if self.failed_assertions > 0 {
            "failed"
        } else {
            "passed"
        };
        let result = json!({
            "name": "list orders",
            "status": outcome,
            "parameters": [{"name": "authorization", "value": SECRET}],
        });
        std::fs::write(
            results_dir.join("0001-result.json"),
            serde_json::to_string_pretty(&result)?,
        )?;
        if self.write_binary {
            std::fs::write(results_dir.join("0002-attachment.txt"), [0xff, 0xfe, 0x01])?;
        }

        Ok(RunSummary::new(
            StatCounter::new(2, 0),
            StatCounter::new(2, self.failed_assertions),
        ))
    }
}

#[derive(Default)]
struct GeneratorLog {
    /// Files found in `results/history` on each call
    merged: Vec<Vec<String>>,
    saw_secret: bool,
}

/// Folds the merged history into `report/history` the way the report tool does
struct FakeGenerator {
    fail: bool,
    /// Fail before writing any output, like a missing report tool
    fail_early: bool,
    log: Arc<Mutex<GeneratorLog>>,
}

#[async_trait]
impl ReportGenerator for FakeGenerator {
    async fn generate(
        &self,
        results_dir: &Path,
        report_dir: &Path,
        _context: &ReportContext,
    ) -> Result<()> {
        if self.fail_early {
            return Err(Error::Report("allure not found".to_string()));
        }

        let mut merged: Vec<String> = std::fs::read_dir(results_dir.join("history"))?
            .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<std::io::Result<_>>()?;
        merged.sort();

        let mut saw_secret = false;
        for entry in std::fs::read_dir(results_dir)? {
            let path = entry?.path();
            if path.is_file() {
                let content = String::from_utf8_lossy(&std::fs::read(&path)?).into_owned();
                saw_secret |= content.contains("abc123def456ghi789");
            }
        }

        {
            let mut log = self.log.lock().unwrap();
            log.merged.push(merged.clone());
            log.saw_secret |= saw_secret;
        }

        std::fs::create_dir_all(report_dir.join("history"))?;
        std::fs::write(report_dir.join("index.html"), "<html></html>")?;
        if self.fail {
            return Err(Error::Report("allure exited with 1".to_string()));
        }

        let points: Vec<_> = (0..=merged.len()).map(|i| json!({"buildOrder": i})).collect();
        std::fs::write(
            report_dir.join("history").join("history-trend.json"),
            serde_json::to_string(&points)?,
        )?;
        Ok(())
    }
}

struct FakeDeployer {
    fail: bool,
    calls: Arc<Mutex<usize>>,
}

#[async_trait]
impl Deployer for FakeDeployer {
    async fn deploy(&self, report_dir: &Path) -> Result<String> {
        *self.calls.lock().unwrap() += 1;
        assert!(report_dir.join("index.html").exists());
        if self.fail {
            return Err(Error::Deploy("push rejected".to_string()));
        }
        Ok("https://reports.example.com".to_string())
    }

    fn target(&self) -> &'static str {
        "fake"
    }
}

struct FakeNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

struct Harness {
    temp: TempDir,
    runner_calls: Arc<Mutex<usize>>,
    generator_log: Arc<Mutex<GeneratorLog>>,
    deploy_calls: Arc<Mutex<usize>>,
    notifications: Arc<Mutex<Vec<Notification>>>,
}

#[derive(Default, Clone, Copy)]
struct Scenario {
    fetch_fails: bool,
    failed_assertions: u64,
    binary_artifact: bool,
    report_fails: bool,
    report_fails_early: bool,
    deploy: bool,
    deploy_fails: bool,
    notify: bool,
    fail_fast: bool,
}

impl Harness {
    fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
            runner_calls: Arc::default(),
            generator_log: Arc::default(),
            deploy_calls: Arc::default(),
            notifications: Arc::default(),
        }
    }

    fn store(&self) -> HistoryStore {
        HistoryStore::new(self.temp.path().join(".history"), 3, 10)
    }

    fn pipeline(&self, scenario: Scenario) -> Pipeline {
        let root = self.temp.path();
        let paths = PipelinePaths {
            results_dir: root.join("allure-results"),
            report_dir: root.join("allure-report"),
            work_dir: root.join(".apirun"),
        };

        let mut pipeline = Pipeline::new(
            Box::new(FakeSource {
                fail: scenario.fetch_fails,
            }),
            Box::new(FakeRunner {
                failed_assertions: scenario.failed_assertions,
                calls: self.runner_calls.clone(),
                write_binary: scenario.binary_artifact,
            }),
            Box::new(FakeGenerator {
                fail: scenario.report_fails,
                fail_early: scenario.report_fails_early,
                log: self.generator_log.clone(),
            }),
            self.store(),
            paths,
        )
        .with_policy(if scenario.fail_fast {
            FailurePolicy::FailFast
        } else {
            FailurePolicy::BestEffort
        });

        if scenario.deploy {
            pipeline = pipeline.with_deployer(Box::new(FakeDeployer {
                fail: scenario.deploy_fails,
                calls: self.deploy_calls.clone(),
            }));
        }
        if scenario.notify {
            pipeline = pipeline.with_notifier(Box::new(FakeNotifier {
                sent: self.notifications.clone(),
            }));
        }
        pipeline
    }
}

fn status(report: &apirun_core::PipelineReport, stage: Stage) -> StageStatus {
    report.outcome(stage).unwrap().status.clone()
}

#[tokio::test]
async fn test_first_run() {
    let harness = Harness::new();
    let report = harness.pipeline(Scenario::default()).run().await;

    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.stages.len(), Stage::ALL.len());
    assert_eq!(status(&report, Stage::MergeHistory), StageStatus::Passed);
    assert_eq!(status(&report, Stage::SnapshotHistory), StageStatus::Passed);
    assert!(matches!(status(&report, Stage::Deploy), StageStatus::Skipped(_)));

    let log = harness.generator_log.lock().unwrap();
    assert_eq!(log.merged, vec![Vec::<String>::new()]);
    assert_eq!(harness.store().list_entries().unwrap().len(), 1);
}

#[tokio::test]
async fn test_four_runs_keep_three_entries() {
    let harness = Harness::new();
    for _ in 0..4 {
        let report = harness.pipeline(Scenario::default()).run().await;
        assert_eq!(report.exit_code(), 0);
    }

    assert_eq!(harness.store().list_entries().unwrap().len(), 3);

    let log = harness.generator_log.lock().unwrap();
    let merged_counts: Vec<usize> = log.merged.iter().map(Vec::len).collect();
    assert_eq!(merged_counts, vec![0, 1, 2, 3]);
    // Every merged file carries its entry prefix
    let suffix = "-history-trend.json";
    assert!(
        log.merged[3]
            .iter()
            .all(|name| name.ends_with(suffix) && name.len() > suffix.len())
    );
}

#[tokio::test]
async fn test_failed_assertion_fails_the_run() {
    let harness = Harness::new();
    let report = harness
        .pipeline(Scenario {
            failed_assertions: 1,
            deploy: true,
            notify: true,
            ..Scenario::default()
        })
        .run()
        .await;

    let summary = report.summary.clone().unwrap();
    assert_eq!(summary.requests.total, 2);
    assert_eq!(summary.assertions.failed, 1);
    assert_eq!(report.exit_code(), 1);
    assert!(report.abort_reason.is_none());

    // Publishing still happens for a failing run
    assert_eq!(*harness.deploy_calls.lock().unwrap(), 1);
    assert_eq!(report.report_url.as_deref(), Some("https://reports.example.com"));
    let sent = harness.notifications.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].summary.assertions.failed, 1);
}

#[tokio::test]
async fn test_artifacts_are_redacted_before_merge_and_report() {
    let harness = Harness::new();
    for _ in 0..2 {
        harness.pipeline(Scenario::default()).run().await;
    }

    assert!(!harness.generator_log.lock().unwrap().saw_secret);

    let result =
        std::fs::read_to_string(harness.temp.path().join("allure-results/0001-result.json"))
            .unwrap();
    assert!(result.contains("[REDACTED]"));
    assert!(!result.contains("abc123def456ghi789"));

    for entry in harness.store().list_entries().unwrap() {
        for file in entry.files().unwrap() {
            let content = std::fs::read_to_string(file).unwrap();
            assert!(!content.contains("abc123def456ghi789"));
        }
    }
}

#[tokio::test]
async fn test_fetch_failure_aborts_everything() {
    let harness = Harness::new();
    let report = harness
        .pipeline(Scenario {
            fetch_fails: true,
            deploy: true,
            ..Scenario::default()
        })
        .run()
        .await;

    assert_eq!(report.exit_code(), 1);
    assert!(report.summary.is_none());
    assert_eq!(*harness.runner_calls.lock().unwrap(), 0);
    assert!(matches!(status(&report, Stage::FetchCollection), StageStatus::Failed(_)));
    for stage in Stage::FetchCollection.following() {
        assert!(matches!(status(&report, stage), StageStatus::Skipped(_)));
    }
}

#[tokio::test]
async fn test_redaction_failure_blocks_publishing() {
    let harness = Harness::new();
    let report = harness
        .pipeline(Scenario {
            binary_artifact: true,
            deploy: true,
            ..Scenario::default()
        })
        .run()
        .await;

    assert_eq!(report.exit_code(), 1);
    assert!(matches!(status(&report, Stage::Redact), StageStatus::Failed(_)));
    assert!(matches!(status(&report, Stage::GenerateReport), StageStatus::Skipped(_)));
    assert_eq!(*harness.deploy_calls.lock().unwrap(), 0);
    assert!(harness.generator_log.lock().unwrap().merged.is_empty());
}

#[tokio::test]
async fn test_report_failure_best_effort_still_deploys() {
    let harness = Harness::new();
    let report = harness
        .pipeline(Scenario {
            report_fails: true,
            deploy: true,
            ..Scenario::default()
        })
        .run()
        .await;

    assert!(matches!(status(&report, Stage::GenerateReport), StageStatus::Failed(_)));
    assert!(matches!(status(&report, Stage::SnapshotHistory), StageStatus::Skipped(_)));
    assert_eq!(status(&report, Stage::Deploy), StageStatus::Passed);
    assert!(harness.store().list_entries().unwrap().is_empty());
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn test_report_failure_fail_fast_stops() {
    let harness = Harness::new();
    let report = harness
        .pipeline(Scenario {
            report_fails: true,
            deploy: true,
            fail_fast: true,
            ..Scenario::default()
        })
        .run()
        .await;

    assert!(matches!(status(&report, Stage::Deploy), StageStatus::Skipped(_)));
    assert_eq!(*harness.deploy_calls.lock().unwrap(), 0);
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn test_deploy_failure_policies() {
    let harness = Harness::new();
    let scenario = Scenario {
        deploy: true,
        deploy_fails: true,
        notify: true,
        ..Scenario::default()
    };

    let report = harness.pipeline(scenario).run().await;
    assert!(matches!(status(&report, Stage::Deploy), StageStatus::Failed(_)));
    assert!(matches!(status(&report, Stage::Notify), StageStatus::Skipped(_)));
    assert_eq!(report.exit_code(), 0);
    // History is stored before deploy, whatever deploy does
    assert_eq!(harness.store().list_entries().unwrap().len(), 1);

    let report = harness
        .pipeline(Scenario {
            fail_fast: true,
            ..scenario
        })
        .run()
        .await;
    assert_eq!(report.exit_code(), 1);
    assert!(harness.notifications.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_report_never_republishes_previous_run() {
    let harness = Harness::new();
    let scenario = Scenario {
        deploy: true,
        notify: true,
        ..Scenario::default()
    };

    let first = harness.pipeline(scenario).run().await;
    assert_eq!(status(&first, Stage::Deploy), StageStatus::Passed);
    assert!(harness.temp.path().join("allure-report/index.html").exists());

    let second = harness
        .pipeline(Scenario {
            report_fails_early: true,
            ..scenario
        })
        .run()
        .await;

    assert!(matches!(status(&second, Stage::GenerateReport), StageStatus::Failed(_)));
    assert!(matches!(status(&second, Stage::Deploy), StageStatus::Skipped(_)));
    assert!(matches!(status(&second, Stage::Notify), StageStatus::Skipped(_)));
    assert!(second.report_url.is_none());
    assert!(!harness.temp.path().join("allure-report").exists());
    assert_eq!(*harness.deploy_calls.lock().unwrap(), 1);
    assert_eq!(harness.notifications.lock().unwrap().len(), 1);
}

/// Plants an entry whose prefixed file name is too long to copy
fn plant_unmergeable_entry(harness: &Harness) -> String {
    let id = "2020-01-01T00-00-00-000000000Z".to_string();
    let entry = harness.temp.path().join(".history").join(&id);
    std::fs::create_dir_all(&entry).unwrap();
    let name = format!("{}.json", "a".repeat(240));
    std::fs::write(entry.join(name), "[]").unwrap();
    id
}

#[tokio::test]
async fn test_merge_failure_leaves_window_untouched() {
    let harness = Harness::new();
    let id = plant_unmergeable_entry(&harness);

    let report = harness.pipeline(Scenario::default()).run().await;

    assert!(matches!(status(&report, Stage::MergeHistory), StageStatus::Failed(_)));
    assert_eq!(status(&report, Stage::GenerateReport), StageStatus::Passed);
    assert!(matches!(status(&report, Stage::SnapshotHistory), StageStatus::Skipped(_)));
    assert!(report.abort_reason.is_some());
    assert_eq!(report.exit_code(), 1);

    let ids: Vec<String> = harness
        .store()
        .list_entries()
        .unwrap()
        .into_iter()
        .map(|entry| entry.id)
        .collect();
    assert_eq!(ids, vec![id]);
}

#[tokio::test]
async fn test_merge_failure_fail_fast_stops() {
    let harness = Harness::new();
    plant_unmergeable_entry(&harness);

    let report = harness
        .pipeline(Scenario {
            fail_fast: true,
            ..Scenario::default()
        })
        .run()
        .await;

    assert!(matches!(status(&report, Stage::MergeHistory), StageStatus::Failed(_)));
    assert!(matches!(status(&report, Stage::GenerateReport), StageStatus::Skipped(_)));
    assert_eq!(report.exit_code(), 1);
    assert!(harness.generator_log.lock().unwrap().merged.is_empty());
}
