use caseruntime::{compile, PipelineRuntime, RuntimeConfig, TaskRegistry};
use casecore::{RegistryError, RunStatus};
use casetasks::{
    standard_stages, InMemoryCommandChannel, StaticParameterStore, TaskDeps, STANDARD_PIPELINE,
};
use std::sync::Arc;
use std::time::Duration;

const ALL_OPERATIONS: [&str; 7] = [
    "reset_cases",
    "parse_invalid_characters",
    "parse_footnotes",
    "parse_empty_citations",
    "parse_courts",
    "parse_case_to_case",
    "parse_legislation_to_cases",
];

struct Fixture {
    runtime: PipelineRuntime,
    channel: Arc<InMemoryCommandChannel>,
}

async fn fixture() -> Fixture {
    let channel = Arc::new(InMemoryCommandChannel::new());
    let deps = TaskDeps::new(
        channel.clone(),
        Arc::new(StaticParameterStore::local_defaults()),
    );

    let mut registry = TaskRegistry::new();
    casetasks::register_all(&mut registry, &deps, Duration::from_secs(5)).unwrap();

    let runtime = PipelineRuntime::with_registry(Arc::new(registry), RuntimeConfig::default());
    runtime
        .register_pipeline(STANDARD_PIPELINE, &standard_stages())
        .await
        .unwrap();

    Fixture { runtime, channel }
}

fn position(ops: &[String], name: &str) -> usize {
    ops.iter()
        .position(|o| o == name)
        .unwrap_or_else(|| panic!("operation {name} was not dispatched"))
}

#[test]
fn standard_stages_compile_against_the_standard_registry() {
    let deps = TaskDeps::new(
        Arc::new(InMemoryCommandChannel::new()),
        Arc::new(StaticParameterStore::local_defaults()),
    );
    let mut registry = TaskRegistry::new();
    casetasks::register_all(&mut registry, &deps, Duration::from_secs(5)).unwrap();

    let def = compile(STANDARD_PIPELINE, &standard_stages(), &registry).unwrap();
    assert_eq!(def.task_count(), 7);
    assert_eq!(registry.task_names().len(), 7);
}

#[test]
fn registering_the_library_twice_fails() {
    let deps = TaskDeps::new(
        Arc::new(InMemoryCommandChannel::new()),
        Arc::new(StaticParameterStore::local_defaults()),
    );
    let mut registry = TaskRegistry::new();
    casetasks::register_all(&mut registry, &deps, Duration::from_secs(5)).unwrap();

    let err = casetasks::register_all(&mut registry, &deps, Duration::from_secs(5)).unwrap_err();
    assert_eq!(
        err,
        RegistryError::DuplicateTaskName("reset_cases".to_string())
    );
}

#[tokio::test]
async fn standard_pipeline_dispatches_every_operation_in_precedence_order() {
    let f = fixture().await;

    let run = f
        .runtime
        .run_workflow(STANDARD_PIPELINE, serde_json::json!({"trigger": "schedule"}))
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Succeeded);

    let ops = f.channel.operations();
    assert_eq!(ops.len(), 7);
    for op in ALL_OPERATIONS {
        assert!(ops.contains(&op.to_string()), "missing operation {op}");
    }

    assert_eq!(position(&ops, "reset_cases"), 0);
    assert_eq!(position(&ops, "parse_invalid_characters"), 1);
    for citation_pass in ["parse_footnotes", "parse_empty_citations"] {
        for linking_pass in ["parse_courts", "parse_case_to_case", "parse_legislation_to_cases"] {
            assert!(position(&ops, citation_pass) < position(&ops, linking_pass));
        }
    }
}

#[tokio::test]
async fn worker_commands_carry_datastore_params_and_trigger_event() {
    let f = fixture().await;

    f.runtime
        .run_workflow(STANDARD_PIPELINE, serde_json::json!({"source": "manual"}))
        .await
        .unwrap();

    let commands = f.channel.commands();
    let first = &commands[0];
    assert_eq!(first.operation, "reset_cases");
    assert_eq!(first.params["datastore"]["host"], "localhost");
    assert_eq!(first.params["datastore"]["port"], 5432);
    assert_eq!(first.params["event"]["source"], "manual");
}

#[tokio::test]
async fn citation_pass_failure_stops_the_linking_stage() {
    let f = fixture().await;
    f.channel
        .fail_operation("parse_empty_citations", "worker unavailable");
    // Let the footnote pass land before the failure is reported.
    f.channel
        .delay_operation("parse_empty_citations", Duration::from_millis(50));

    let run = f
        .runtime
        .run_workflow(STANDARD_PIPELINE, serde_json::Value::Null)
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Failed);

    let ops = f.channel.operations();
    assert!(ops.contains(&"parse_footnotes".to_string()));
    for never in ["parse_courts", "parse_case_to_case", "parse_legislation_to_cases"] {
        assert!(!ops.contains(&never.to_string()), "{never} should not run");
    }
}

#[tokio::test]
async fn missing_datastore_parameters_fail_the_run() {
    let channel = Arc::new(InMemoryCommandChannel::new());
    let deps = TaskDeps::new(channel.clone(), Arc::new(StaticParameterStore::new()));

    let mut registry = TaskRegistry::new();
    casetasks::register_all(&mut registry, &deps, Duration::from_secs(5)).unwrap();

    let runtime = PipelineRuntime::with_registry(Arc::new(registry), RuntimeConfig::default());
    runtime
        .register_pipeline(STANDARD_PIPELINE, &standard_stages())
        .await
        .unwrap();

    let run = runtime
        .run_workflow(STANDARD_PIPELINE, serde_json::Value::Null)
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Failed);
    assert!(channel.operations().is_empty());
}
