use crate::{invoker::TaskInvoker, registry::TaskRegistry};
use casecore::{
    EngineError, EventBus, RunContext, RunEvent, RunId, RunStatus, TaskError, TaskOutcome,
    WorkflowDefinition, WorkflowNode,
};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Interprets compiled workflow trees, one run at a time per trigger.
///
/// Each run advances Pending -> Running -> (Succeeded | Failed) and is
/// retained in the run table for status lookup after it terminates,
/// up to `max_run_history` terminal records.
pub struct ExecutionEngine {
    invoker: TaskInvoker,
    events: Arc<EventBus>,
    runs: RwLock<HashMap<RunId, RunContext>>,
    max_concurrent_runs: usize,
    max_run_history: usize,
}

impl ExecutionEngine {
    pub fn new(
        registry: Arc<TaskRegistry>,
        events: Arc<EventBus>,
        max_concurrent_runs: usize,
        max_run_history: usize,
    ) -> Self {
        Self {
            invoker: TaskInvoker::new(registry, events.clone()),
            events,
            runs: RwLock::new(HashMap::new()),
            max_concurrent_runs,
            max_run_history,
        }
    }

    /// Start a run on its own tokio task and return its id immediately.
    /// The caller is never blocked for the run's duration.
    pub async fn start_run(
        self: &Arc<Self>,
        def: Arc<WorkflowDefinition>,
        input: serde_json::Value,
    ) -> Result<RunId, EngineError> {
        let run_id = self.admit(&def, input.clone()).await?;

        let engine = self.clone();
        tokio::spawn(async move {
            engine.drive(def, run_id, input).await;
        });

        Ok(run_id)
    }

    /// Run a workflow to completion and return the terminal run record.
    pub async fn execute(
        self: &Arc<Self>,
        def: Arc<WorkflowDefinition>,
        input: serde_json::Value,
    ) -> Result<RunContext, EngineError> {
        let run_id = self.admit(&def, input.clone()).await?;
        Ok(self.clone().drive(def, run_id, input).await)
    }

    /// Look up a run by id, whether in flight or terminal.
    pub async fn run_status(&self, run_id: RunId) -> Option<RunContext> {
        self.runs.read().await.get(&run_id).cloned()
    }

    /// Create the run record and transition it straight to Running.
    async fn admit(
        &self,
        def: &WorkflowDefinition,
        input: serde_json::Value,
    ) -> Result<RunId, EngineError> {
        let mut runs = self.runs.write().await;

        let active = runs.values().filter(|r| !r.status.is_terminal()).count();
        if active >= self.max_concurrent_runs {
            return Err(EngineError::SchedulingFailure(format!(
                "engine at capacity ({active} active runs)"
            )));
        }

        let mut run = RunContext::new(&def.name, input);
        run.advance(RunStatus::Running);
        let run_id = run.run_id;
        runs.insert(run_id, run);
        Ok(run_id)
    }

    /// Walk the tree and settle the run's terminal status.
    async fn drive(
        self: Arc<Self>,
        def: Arc<WorkflowDefinition>,
        run_id: RunId,
        input: serde_json::Value,
    ) -> RunContext {
        tracing::info!(run_id = %run_id, workflow = %def.name, "Run started");
        self.events.emit(RunEvent::RunStarted {
            run_id,
            workflow: def.name.clone(),
            timestamp: Utc::now(),
        });

        let start = Instant::now();
        let outcome = self.clone().exec_node(def.root.clone(), run_id, input).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let status = match outcome {
            Ok(()) => RunStatus::Succeeded,
            Err(ref e) => {
                tracing::error!(run_id = %run_id, error = %e, "Run failed");
                RunStatus::Failed
            }
        };

        let run = {
            let mut runs = self.runs.write().await;
            let run = match runs.get_mut(&run_id) {
                Some(run) => {
                    run.advance(status);
                    run.clone()
                }
                None => {
                    // The run table only ever grows, so this is unreachable
                    // in practice; settle a detached record anyway.
                    tracing::error!(run_id = %run_id, "Run record missing at completion");
                    let mut run = RunContext::new(&def.name, serde_json::Value::Null);
                    run.advance(RunStatus::Running);
                    run.advance(status);
                    run
                }
            };
            Self::prune_history(&mut runs, self.max_run_history);
            run
        };

        tracing::info!(run_id = %run_id, status = ?status, duration_ms, "Run completed");
        self.events.emit(RunEvent::RunCompleted {
            run_id,
            status,
            duration_ms,
            timestamp: Utc::now(),
        });

        run
    }

    /// Evict the oldest terminal runs once the history cap is exceeded.
    /// Active runs are never evicted.
    fn prune_history(runs: &mut HashMap<RunId, RunContext>, cap: usize) {
        let mut terminal: Vec<(RunId, DateTime<Utc>)> = runs
            .values()
            .filter(|r| r.status.is_terminal())
            .map(|r| (r.run_id, r.completed_at.unwrap_or(r.started_at)))
            .collect();
        if terminal.len() <= cap {
            return;
        }

        let excess = terminal.len() - cap;
        terminal.sort_by_key(|&(_, at)| at);
        for (run_id, _) in terminal.into_iter().take(excess) {
            tracing::debug!(run_id = %run_id, "Evicting terminal run from history");
            runs.remove(&run_id);
        }
    }

    /// Recursive tree walk.
    ///
    /// Task: invoke and propagate failure. Sequence: children strictly
    /// in order, first failure short-circuits. Parallel: all branches
    /// spawned concurrently with a fan-in barrier; the first failing
    /// branch fails the node immediately, and in-flight siblings keep
    /// running detached with their outcomes discarded. Nothing is
    /// force-cancelled and nothing is rolled back.
    fn exec_node(
        self: Arc<Self>,
        node: WorkflowNode,
        run_id: RunId,
        input: serde_json::Value,
    ) -> BoxFuture<'static, Result<(), TaskError>> {
        Box::pin(async move {
            match node {
                WorkflowNode::Task(spec) => {
                    let result = self.invoker.invoke(&spec, run_id, input).await;
                    match result.outcome {
                        TaskOutcome::Success => Ok(()),
                        TaskOutcome::Failure(e) => Err(e),
                    }
                }
                WorkflowNode::Sequence(children) => {
                    for child in children {
                        self.clone().exec_node(child, run_id, input.clone()).await?;
                    }
                    Ok(())
                }
                WorkflowNode::Parallel(branches) => {
                    let mut in_flight = FuturesUnordered::new();
                    for branch in branches {
                        let engine = self.clone();
                        let input = input.clone();
                        in_flight.push(tokio::spawn(engine.exec_node(branch, run_id, input)));
                    }

                    while let Some(joined) = in_flight.next().await {
                        match joined {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => return Err(e),
                            Err(e) => {
                                return Err(TaskError::Handler(format!(
                                    "parallel branch panicked: {e}"
                                )))
                            }
                        }
                    }
                    Ok(())
                }
            }
        })
    }
}
