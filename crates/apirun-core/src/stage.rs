//! Pipeline stages and their outcomes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stages of one run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ResetWorkingSet,
    FetchCollection,
    Execute,
    Redact,
    MergeHistory,
    GenerateReport,
    SnapshotHistory,
    Deploy,
    Notify,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::ResetWorkingSet,
        Stage::FetchCollection,
        Stage::Execute,
        Stage::Redact,
        Stage::MergeHistory,
        Stage::GenerateReport,
        Stage::SnapshotHistory,
        Stage::Deploy,
        Stage::Notify,
    ];

    /// Stages that run after this one
    pub fn following(self) -> impl Iterator<Item = Stage> {
        Self::ALL.into_iter().skip_while(move |s| *s != self).skip(1)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::ResetWorkingSet => "reset_working_set",
            Stage::FetchCollection => "fetch_collection",
            Stage::Execute => "execute",
            Stage::Redact => "redact",
            Stage::MergeHistory => "merge_history",
            Stage::GenerateReport => "generate_report",
            Stage::SnapshotHistory => "snapshot_history",
            Stage::Deploy => "deploy",
            Stage::Notify => "notify",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum StageStatus {
    Passed,
    Failed(String),
    Skipped(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: Stage,
    #[serde(flatten)]
    pub status: StageStatus,
    pub duration_ms: u64,
}

impl StageOutcome {
    pub fn passed(stage: Stage, duration_ms: u64) -> Self {
        Self {
            stage,
            status: StageStatus::Passed,
            duration_ms,
        }
    }

    pub fn failed(stage: Stage, reason: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            stage,
            status: StageStatus::Failed(reason.into()),
            duration_ms,
        }
    }

    pub fn skipped(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Skipped(reason.into()),
            duration_ms: 0,
        }
    }

    pub fn is_passed(&self) -> bool {
        self.status == StageStatus::Passed
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, StageStatus::Failed(_))
    }
}
