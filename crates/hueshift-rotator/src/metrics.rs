//! Metrics collection for rotation tasks

use crate::CommitOutcome;

/// Counters kept by one rotation task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationMetrics {
    /// Successful commits
    pub commits: usize,

    /// Cycles skipped because the pool was empty
    pub skips: usize,

    /// Assets removed after a failure
    pub evictions: usize,

    /// Failed commits whose asset was kept
    pub retained: usize,

    /// Rate limits escalated to the operator
    pub escalations: usize,

    /// Flourishes played to completion
    pub flourishes: usize,

    /// Commit cycles attempted
    pub cycle_count: usize,
}

impl RotationMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one commit cycle
    pub fn record_outcome(&mut self, outcome: &CommitOutcome) {
        self.cycle_count += 1;
        match outcome {
            CommitOutcome::Applied(_) => self.commits += 1,
            CommitOutcome::Skipped => self.skips += 1,
            CommitOutcome::Retained { .. } => self.retained += 1,
            CommitOutcome::Evicted { .. } => self.evictions += 1,
            CommitOutcome::Escalated { .. } => self.escalations += 1,
        }
    }

    /// Record a completed flourish
    pub fn record_flourish(&mut self) {
        self.flourishes += 1;
    }

    /// Record an escalation raised outside a commit (e.g. mid-flourish)
    pub fn record_escalation(&mut self) {
        self.escalations += 1;
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let lines = [
            "Rotation Metrics Summary".to_string(),
            "========================".to_string(),
            format!("Cycles: {}", self.cycle_count),
            format!("Commits: {}", self.commits),
            format!("Skipped (empty pool): {}", self.skips),
            format!("Evictions: {}", self.evictions),
            format!("Retained after failure: {}", self.retained),
            format!("Escalations: {}", self.escalations),
            format!("Flourishes: {}", self.flourishes),
        ];
        lines.join("\n")
    }
}
