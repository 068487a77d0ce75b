use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type RunId = Uuid;

/// Lifecycle of a run. Transitions are monotonic:
/// Pending -> Running -> (Succeeded | Failed), never backwards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RunStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            RunStatus::Pending => 0,
            RunStatus::Running => 1,
            RunStatus::Succeeded | RunStatus::Failed => 2,
        }
    }
}

/// State of one execution instance of a workflow. Created per trigger,
/// mutated exclusively by the engine, retained for status lookup once
/// terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    pub run_id: RunId,
    pub workflow: String,
    pub input: serde_json::Value,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RunContext {
    pub fn new(workflow: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            workflow: workflow.into(),
            input,
            status: RunStatus::Pending,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Advance the run status. Regressions are ignored so a terminal
    /// status can never be overwritten.
    pub fn advance(&mut self, next: RunStatus) {
        if next.rank() <= self.status.rank() && next != self.status {
            tracing::warn!(
                run_id = %self.run_id,
                from = ?self.status,
                to = ?next,
                "Ignoring run status regression"
            );
            return;
        }
        if self.status.is_terminal() {
            return;
        }
        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
    }
}
