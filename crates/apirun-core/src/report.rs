//! Result of one pipeline invocation

use crate::{RunSummary, Stage, StageOutcome};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: String,
    #[serde(with = "time::serde::timestamp")]
    pub started_at: OffsetDateTime,
    /// Present once the runner produced a summary.
    pub summary: Option<RunSummary>,
    pub stages: Vec<StageOutcome>,
    /// Set when a stage failure must fail the run regardless of assertions.
    pub abort_reason: Option<String>,
    /// Where the report was published, if deployed.
    pub report_url: Option<String>,
}

impl PipelineReport {
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: OffsetDateTime::now_utc(),
            summary: None,
            stages: Vec::new(),
            abort_reason: None,
            report_url: None,
        }
    }

    pub fn record(&mut self, outcome: StageOutcome) {
        self.stages.push(outcome);
    }

    pub fn abort(&mut self, reason: impl Into<String>) {
        if self.abort_reason.is_none() {
            self.abort_reason = Some(reason.into());
        }
    }

    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages.iter().find(|o| o.stage == stage)
    }

    pub fn passed_count(&self) -> usize {
        self.stages.iter().filter(|s| s.is_passed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.stages.iter().filter(|s| s.is_failed()).count()
    }

    /// 0 only when the runner reported zero failed assertions and nothing
    /// aborted the run.
    pub fn exit_code(&self) -> i32 {
        match (&self.summary, &self.abort_reason) {
            (Some(summary), None) if !summary.has_failures() => 0,
            _ => 1,
        }
    }
}

impl Default for PipelineReport {
    fn default() -> Self {
        Self::new()
    }
}
