use thiserror::Error;

/// Errors raised while building the task registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Duplicate task name: {0}")]
    DuplicateTaskName(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),
}

/// Compile-time errors. Fatal to workflow registration: no partially
/// built definition is ever handed out.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Unresolved task: {0}")]
    UnresolvedTask(String),

    #[error("Task referenced more than once in workflow: {0}")]
    DuplicateNodeReference(String),

    #[error("Pipeline has no stages")]
    EmptyPipeline,

    #[error("Parallel stage has an empty branch set")]
    EmptyParallel,
}

/// Run-time, per-task failures. Terminal for the enclosing run; the
/// engine does not retry them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Timeout after {seconds}s")]
    Timeout { seconds: u64 },
}

/// Errors surfaced when scheduling or looking up runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("Run could not be scheduled: {0}")]
    SchedulingFailure(String),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
