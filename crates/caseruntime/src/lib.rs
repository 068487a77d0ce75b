//! Workflow execution runtime
//!
//! This crate provides the task registry, the stage-list compiler, the
//! task invoker, and the execution engine that walks compiled workflow
//! trees with sequential and parallel stages.

mod compiler;
mod engine;
mod invoker;
mod registry;
mod runtime;

pub use compiler::compile;
pub use engine::ExecutionEngine;
pub use invoker::TaskInvoker;
pub use registry::TaskRegistry;
pub use runtime::{PipelineRuntime, RuntimeConfig};
