//! Core abstractions for the caseflow orchestrator
//!
//! This crate provides the fundamental types and traits that all other
//! components depend on: the task handler contract, the compiled
//! workflow tree, run state, the error taxonomy, and the run event bus.

mod error;
mod events;
mod run;
mod task;
mod workflow;

pub use error::{CompileError, EngineError, PipelineError, RegistryError, TaskError};
pub use events::{EventBus, RunEvent, TaskEmitter, TaskMessage};
pub use run::{RunContext, RunId, RunStatus};
pub use task::{TaskContext, TaskHandler, TaskOutcome, TaskResult, TaskSpec};
pub use workflow::{PipelineSpec, Stage, WorkflowDefinition, WorkflowNode};

/// Result type for orchestrator operations
pub type Result<T> = std::result::Result<T, PipelineError>;
