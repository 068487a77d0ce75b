use crate::{events::TaskEmitter, RunId, TaskError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Immutable description of a registered task: its unique name and the
/// timeout the invoker enforces per invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: String,
    #[serde(
        rename = "timeout_secs",
        serialize_with = "as_secs",
        deserialize_with = "from_secs"
    )]
    pub timeout: Duration,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            timeout,
        }
    }
}

fn as_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

fn from_secs<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
    let secs = u64::deserialize(d)?;
    Ok(Duration::from_secs(secs))
}

/// The unit of work behind a task name. Opaque to the orchestration
/// core: handlers mutate the shared dataset however they see fit, and
/// are expected to be idempotent and safe to run alongside their
/// parallel-branch siblings.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Unique task name (e.g. "parse_footnotes").
    fn name(&self) -> &str;

    /// Execute the task. An `Err` fails the enclosing run.
    async fn execute(&self, ctx: TaskContext) -> Result<(), TaskError>;
}

impl std::fmt::Debug for dyn TaskHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandler")
            .field("name", &self.name())
            .finish()
    }
}

/// Handler-side view of a run, passed to each invocation.
#[derive(Clone)]
pub struct TaskContext {
    /// Run this invocation belongs to.
    pub run_id: RunId,

    /// Name the task was invoked under.
    pub task_name: String,

    /// Opaque trigger payload, passed through unchanged.
    pub input: serde_json::Value,

    /// Emitter for real-time progress messages.
    pub events: TaskEmitter,
}

/// Outcome of a single task invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failure(TaskError),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success)
    }
}

/// Produced by the invoker per task, consumed by the engine to decide
/// node completion.
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub task_name: String,
    pub outcome: TaskOutcome,
    pub completed_at: DateTime<Utc>,
}

impl TaskResult {
    pub fn success(task_name: impl Into<String>) -> Self {
        Self {
            task_name: task_name.into(),
            outcome: TaskOutcome::Success,
            completed_at: Utc::now(),
        }
    }

    pub fn failure(task_name: impl Into<String>, error: TaskError) -> Self {
        Self {
            task_name: task_name.into(),
            outcome: TaskOutcome::Failure(error),
            completed_at: Utc::now(),
        }
    }
}
