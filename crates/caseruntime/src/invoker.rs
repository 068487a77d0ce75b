use crate::registry::TaskRegistry;
use casecore::{EventBus, RunEvent, RunId, TaskContext, TaskError, TaskResult, TaskSpec};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;

/// Uniform dispatch adapter between the engine and task handlers.
///
/// The invoker resolves the handler, enforces the per-task timeout, and
/// reports the outcome; task semantics are entirely opaque to it.
pub struct TaskInvoker {
    registry: Arc<TaskRegistry>,
    events: Arc<EventBus>,
}

impl TaskInvoker {
    pub fn new(registry: Arc<TaskRegistry>, events: Arc<EventBus>) -> Self {
        Self { registry, events }
    }

    /// Invoke one task and block the calling execution context until
    /// the handler signals completion or the timeout elapses.
    pub async fn invoke(
        &self,
        spec: &TaskSpec,
        run_id: RunId,
        input: serde_json::Value,
    ) -> TaskResult {
        // Started is emitted before resolution so every invocation
        // produces a paired Started/Completed or Started/Failed.
        self.events.emit(RunEvent::TaskStarted {
            run_id,
            task: spec.name.clone(),
            timestamp: Utc::now(),
        });

        let handler = match self.registry.resolve(&spec.name) {
            Ok(handler) => handler,
            Err(e) => {
                // Compilation validates references, so this only fires
                // if a definition outlives its registry.
                tracing::error!(task = %spec.name, error = %e, "Handler resolution failed");
                return self.fail(spec, run_id, TaskError::Handler(e.to_string()));
            }
        };

        let ctx = TaskContext {
            run_id,
            task_name: spec.name.clone(),
            input,
            events: self.events.create_emitter(run_id, &spec.name),
        };

        let start = Instant::now();
        let outcome = match timeout(spec.timeout, handler.execute(ctx)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(TaskError::Timeout {
                seconds: spec.timeout.as_secs(),
            }),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => {
                tracing::info!(task = %spec.name, run_id = %run_id, duration_ms, "Task completed");
                self.events.emit(RunEvent::TaskCompleted {
                    run_id,
                    task: spec.name.clone(),
                    duration_ms,
                    timestamp: Utc::now(),
                });
                TaskResult::success(&spec.name)
            }
            Err(e) => {
                tracing::error!(task = %spec.name, run_id = %run_id, error = %e, "Task failed");
                self.fail(spec, run_id, e)
            }
        }
    }

    fn fail(&self, spec: &TaskSpec, run_id: RunId, error: TaskError) -> TaskResult {
        self.events.emit(RunEvent::TaskFailed {
            run_id,
            task: spec.name.clone(),
            error: error.to_string(),
            timestamp: Utc::now(),
        });
        TaskResult::failure(&spec.name, error)
    }
}
