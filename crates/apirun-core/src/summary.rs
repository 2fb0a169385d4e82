//! Run summary reported by the test runner

use serde::{Deserialize, Serialize};

/// Total/failed pair as exported by the runner's JSON reporter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatCounter {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub failed: u64,
}

impl StatCounter {
    pub fn new(total: u64, failed: u64) -> Self {
        Self { total, failed }
    }

    pub fn passed(&self) -> u64 {
        self.total.saturating_sub(self.failed)
    }
}

/// Outcome counts of one collection run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub requests: StatCounter,
    pub assertions: StatCounter,
}

impl RunSummary {
    pub fn new(requests: StatCounter, assertions: StatCounter) -> Self {
        Self {
            requests,
            assertions,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.assertions.failed > 0
    }

    /// Share of passed assertions in percent, 100 when nothing was asserted.
    pub fn success_rate(&self) -> f64 {
        if self.assertions.total == 0 {
            return 100.0;
        }
        self.assertions.passed() as f64 * 100.0 / self.assertions.total as f64
    }
}
