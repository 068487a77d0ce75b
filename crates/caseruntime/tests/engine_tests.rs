use async_trait::async_trait;
use casecore::{
    EngineError, EventBus, RunContext, RunEvent, RunId, RunStatus, Stage, TaskContext, TaskError,
    TaskHandler, TaskOutcome, TaskSpec,
};
use caseruntime::{PipelineRuntime, RuntimeConfig, TaskInvoker, TaskRegistry};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Test handler that records its invocation, optionally sleeps, and
/// optionally fails.
struct RecordingTask {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
    fail: Option<&'static str>,
}

#[async_trait]
impl TaskHandler for RecordingTask {
    fn name(&self) -> &str {
        self.name
    }

    async fn execute(&self, _ctx: TaskContext) -> Result<(), TaskError> {
        self.log.lock().unwrap().push(self.name.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = self.fail {
            return Err(TaskError::Handler(reason.to_string()));
        }
        Ok(())
    }
}

struct Harness {
    runtime: PipelineRuntime,
    log: Arc<Mutex<Vec<String>>>,
}

impl Harness {
    fn invocations(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn position(&self, task: &str) -> Option<usize> {
        self.invocations().iter().position(|t| t == task)
    }
}

/// Build a runtime whose tasks record into a shared log.
/// `tasks` entries are (name, delay, failure reason).
fn harness(
    tasks: &[(&'static str, Option<Duration>, Option<&'static str>)],
    config: RuntimeConfig,
) -> Harness {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = TaskRegistry::new();
    for (name, delay, fail) in tasks {
        registry
            .register(
                Arc::new(RecordingTask {
                    name,
                    log: log.clone(),
                    delay: *delay,
                    fail: *fail,
                }),
                Duration::from_secs(5),
            )
            .unwrap();
    }

    Harness {
        runtime: PipelineRuntime::with_registry(Arc::new(registry), config),
        log,
    }
}

fn scenario_stages() -> Vec<Stage> {
    vec![
        Stage::task("t1"),
        Stage::parallel_tasks([["t2"], ["t3"]]),
        Stage::parallel_tasks([["t4"], ["t5"], ["t6"]]),
    ]
}

async fn wait_terminal(runtime: &PipelineRuntime, run_id: RunId) -> RunContext {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(run) = runtime.run_status(run_id).await {
                if run.status.is_terminal() {
                    return run;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("run did not reach a terminal status")
}

#[tokio::test]
async fn scenario_a_all_tasks_succeed_in_stage_order() {
    let h = harness(
        &[
            ("t1", None, None),
            ("t2", None, None),
            ("t3", None, None),
            ("t4", None, None),
            ("t5", None, None),
            ("t6", None, None),
        ],
        RuntimeConfig::default(),
    );
    h.runtime
        .register_pipeline("pipeline", &scenario_stages())
        .await
        .unwrap();

    let run = h
        .runtime
        .run_workflow("pipeline", serde_json::Value::Null)
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Succeeded);
    assert!(run.completed_at.is_some());
    assert_eq!(h.invocations().len(), 6);

    let t1 = h.position("t1").unwrap();
    for later in ["t2", "t3", "t4", "t5", "t6"] {
        assert!(t1 < h.position(later).unwrap());
    }
    for group1 in ["t2", "t3"] {
        for group2 in ["t4", "t5", "t6"] {
            assert!(h.position(group1).unwrap() < h.position(group2).unwrap());
        }
    }
}

#[tokio::test]
async fn scenario_b_parallel_branch_failure_stops_later_stages() {
    let h = harness(
        &[
            ("t1", None, None),
            ("t2", None, None),
            // Delay so t2 completes before the failure lands.
            ("t3", Some(Duration::from_millis(50)), Some("boom")),
            ("t4", None, None),
            ("t5", None, None),
            ("t6", None, None),
        ],
        RuntimeConfig::default(),
    );
    h.runtime
        .register_pipeline("pipeline", &scenario_stages())
        .await
        .unwrap();

    let run = h
        .runtime
        .run_workflow("pipeline", serde_json::Value::Null)
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Failed);

    let invocations = h.invocations();
    assert!(invocations.contains(&"t2".to_string()));
    for never in ["t4", "t5", "t6"] {
        assert!(!invocations.contains(&never.to_string()));
    }
}

#[tokio::test]
async fn sequence_short_circuits_on_first_failure() {
    let h = harness(
        &[
            ("a", None, None),
            ("b", None, Some("broken")),
            ("c", None, None),
        ],
        RuntimeConfig::default(),
    );
    h.runtime
        .register_pipeline(
            "pipeline",
            &[Stage::task("a"), Stage::task("b"), Stage::task("c")],
        )
        .await
        .unwrap();

    let run = h
        .runtime
        .run_workflow("pipeline", serde_json::Value::Null)
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(h.invocations(), vec!["a", "b"]);
}

#[tokio::test]
async fn scenario_d_timeout_fails_the_run() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = TaskRegistry::new();
    registry
        .register(
            Arc::new(RecordingTask {
                name: "slow",
                log: log.clone(),
                delay: Some(Duration::from_millis(500)),
                fail: None,
            }),
            // Registered timeout far below the handler's sleep.
            Duration::from_millis(50),
        )
        .unwrap();

    let runtime = PipelineRuntime::with_registry(Arc::new(registry), RuntimeConfig::default());
    runtime
        .register_pipeline("pipeline", &[Stage::task("slow")])
        .await
        .unwrap();

    let mut events = runtime.subscribe_events();
    let run = runtime
        .run_workflow("pipeline", serde_json::Value::Null)
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Failed);

    let mut saw_timeout = false;
    while let Ok(event) = events.try_recv() {
        if let RunEvent::TaskFailed { task, error, .. } = event {
            assert_eq!(task, "slow");
            assert!(error.contains("Timeout"), "unexpected error: {error}");
            saw_timeout = true;
        }
    }
    assert!(saw_timeout);
}

#[tokio::test]
async fn runs_are_independent() {
    let h = harness(&[("t1", None, None)], RuntimeConfig::default());
    h.runtime
        .register_pipeline("pipeline", &[Stage::task("t1")])
        .await
        .unwrap();

    let first = h
        .runtime
        .run_workflow("pipeline", serde_json::json!({"batch": 1}))
        .await
        .unwrap();
    let second = h
        .runtime
        .run_workflow("pipeline", serde_json::json!({"batch": 2}))
        .await
        .unwrap();

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.status, RunStatus::Succeeded);
    assert_eq!(second.status, RunStatus::Succeeded);

    // Both runs remain individually addressable afterwards.
    let looked_up = h.runtime.run_status(first.run_id).await.unwrap();
    assert_eq!(looked_up.input, serde_json::json!({"batch": 1}));
}

#[tokio::test]
async fn trigger_returns_before_the_run_completes() {
    let h = harness(
        &[("slow", Some(Duration::from_millis(200)), None)],
        RuntimeConfig::default(),
    );
    h.runtime
        .register_pipeline("pipeline", &[Stage::task("slow")])
        .await
        .unwrap();

    let run_id = h
        .runtime
        .trigger("pipeline", serde_json::Value::Null)
        .await
        .unwrap();

    let early = h.runtime.run_status(run_id).await.unwrap();
    assert_eq!(early.status, RunStatus::Running);

    let run = wait_terminal(&h.runtime, run_id).await;
    assert_eq!(run.status, RunStatus::Succeeded);
}

#[tokio::test]
async fn trigger_rejects_unknown_workflow() {
    let h = harness(&[], RuntimeConfig::default());
    let err = h
        .runtime
        .trigger("missing", serde_json::Value::Null)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::WorkflowNotFound("missing".to_string()));
}

#[tokio::test]
async fn trigger_rejects_runs_beyond_capacity() {
    let h = harness(
        &[("slow", Some(Duration::from_millis(500)), None)],
        RuntimeConfig {
            max_concurrent_runs: 1,
            ..RuntimeConfig::default()
        },
    );
    h.runtime
        .register_pipeline("pipeline", &[Stage::task("slow")])
        .await
        .unwrap();

    let first = h
        .runtime
        .trigger("pipeline", serde_json::Value::Null)
        .await
        .unwrap();

    let err = h
        .runtime
        .trigger("pipeline", serde_json::Value::Null)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SchedulingFailure(_)));

    let run = wait_terminal(&h.runtime, first).await;
    assert_eq!(run.status, RunStatus::Succeeded);
}

#[tokio::test]
async fn parallel_failure_reports_while_a_slow_sibling_is_still_running() {
    let h = harness(
        &[
            ("doomed", None, Some("boom")),
            ("slow", Some(Duration::from_millis(400)), None),
        ],
        RuntimeConfig::default(),
    );
    h.runtime
        .register_pipeline(
            "pipeline",
            &[Stage::parallel_tasks([["doomed"], ["slow"]])],
        )
        .await
        .unwrap();

    let started = std::time::Instant::now();
    let run = h
        .runtime
        .run_workflow("pipeline", serde_json::Value::Null)
        .await
        .unwrap();
    let elapsed = started.elapsed();

    // The fan-in settles on the first failure, well before the sibling
    // finishes its sleep.
    assert_eq!(run.status, RunStatus::Failed);
    assert!(
        elapsed < Duration::from_millis(300),
        "fan-in waited for the slow sibling: {elapsed:?}"
    );
    assert!(h.invocations().contains(&"slow".to_string()));

    // The detached sibling completes later; its success is discarded
    // and the run stays Failed.
    tokio::time::sleep(Duration::from_millis(500)).await;
    let settled = h.runtime.run_status(run.run_id).await.unwrap();
    assert_eq!(settled.status, RunStatus::Failed);
}

#[tokio::test]
async fn terminal_run_history_is_bounded() {
    let h = harness(
        &[("t1", None, None)],
        RuntimeConfig {
            max_run_history: 2,
            ..RuntimeConfig::default()
        },
    );
    h.runtime
        .register_pipeline("pipeline", &[Stage::task("t1")])
        .await
        .unwrap();

    let mut runs = Vec::new();
    for batch in 0..3 {
        let run = h
            .runtime
            .run_workflow("pipeline", serde_json::json!({"batch": batch}))
            .await
            .unwrap();
        runs.push(run.run_id);
    }

    // Oldest terminal run is evicted once the cap is exceeded.
    assert!(h.runtime.run_status(runs[0]).await.is_none());
    assert!(h.runtime.run_status(runs[1]).await.is_some());
    assert!(h.runtime.run_status(runs[2]).await.is_some());
}

#[tokio::test]
async fn resolution_failure_still_pairs_started_and_failed_events() {
    // An empty registry with a definition that names a task reproduces
    // a definition outliving its registry.
    let registry = Arc::new(TaskRegistry::new());
    let events = Arc::new(EventBus::new(16));
    let invoker = TaskInvoker::new(registry, events.clone());
    let mut rx = events.subscribe();

    let run_id = RunContext::new("orphaned", serde_json::Value::Null).run_id;
    let spec = TaskSpec::new("ghost", Duration::from_secs(1));
    let result = invoker.invoke(&spec, run_id, serde_json::Value::Null).await;
    assert!(matches!(result.outcome, TaskOutcome::Failure(_)));

    match rx.try_recv().unwrap() {
        RunEvent::TaskStarted { task, .. } => assert_eq!(task, "ghost"),
        other => panic!("expected TaskStarted first, got {other:?}"),
    }
    match rx.try_recv().unwrap() {
        RunEvent::TaskFailed { task, .. } => assert_eq!(task, "ghost"),
        other => panic!("expected TaskFailed second, got {other:?}"),
    }
}
