//! Standard task library for the case dataset pipeline
//!
//! Each task delegates its actual dataset operation to a long-running
//! worker through the command channel; the handlers here only load the
//! datastore parameters, build the worker command, and await the
//! acknowledgment. Workers are expected to make each operation
//! idempotent and safe to run alongside its parallel-stage siblings.

mod channel;
mod citations;
mod courts;
mod linking;
mod normalize;
mod params;
mod reset;

pub use channel::{ChannelError, CommandChannel, InMemoryCommandChannel, WorkerCommand};
pub use citations::{ParseEmptyCitationsTask, ParseFootnotesTask};
pub use courts::ParseCourtsTask;
pub use linking::{ParseCaseToCaseTask, ParseLegislationToCasesTask};
pub use normalize::ParseInvalidCharactersTask;
pub use params::{
    DatastoreParams, EnvParameterStore, ParamError, ParameterStore, StaticParameterStore,
};
pub use reset::ResetCasesTask;

use casecore::{RegistryError, Stage, TaskContext, TaskError};
use caseruntime::TaskRegistry;
use std::sync::Arc;
use std::time::Duration;

/// Name the standard pipeline is registered under.
pub const STANDARD_PIPELINE: &str = "db-processor";

/// Collaborators shared by every task handler.
#[derive(Clone)]
pub struct TaskDeps {
    pub channel: Arc<dyn CommandChannel>,
    pub params: Arc<dyn ParameterStore>,
}

impl TaskDeps {
    pub fn new(channel: Arc<dyn CommandChannel>, params: Arc<dyn ParameterStore>) -> Self {
        Self { channel, params }
    }
}

/// Register all standard tasks with a registry, each with the same
/// per-invocation timeout.
pub fn register_all(
    registry: &mut TaskRegistry,
    deps: &TaskDeps,
    timeout: Duration,
) -> Result<(), RegistryError> {
    registry.register(Arc::new(ResetCasesTask::new(deps.clone())), timeout)?;
    registry.register(
        Arc::new(ParseInvalidCharactersTask::new(deps.clone())),
        timeout,
    )?;
    registry.register(Arc::new(ParseFootnotesTask::new(deps.clone())), timeout)?;
    registry.register(
        Arc::new(ParseEmptyCitationsTask::new(deps.clone())),
        timeout,
    )?;
    registry.register(Arc::new(ParseCourtsTask::new(deps.clone())), timeout)?;
    registry.register(Arc::new(ParseCaseToCaseTask::new(deps.clone())), timeout)?;
    registry.register(
        Arc::new(ParseLegislationToCasesTask::new(deps.clone())),
        timeout,
    )?;
    Ok(())
}

/// Stage list of the standard dataset pipeline: reset, normalize, then
/// the citation passes in parallel, then the court and linking passes
/// in parallel.
pub fn standard_stages() -> Vec<Stage> {
    vec![
        Stage::task("reset_cases"),
        Stage::task("parse_invalid_characters"),
        Stage::parallel_tasks([["parse_footnotes"], ["parse_empty_citations"]]),
        Stage::parallel_tasks([
            ["parse_courts"],
            ["parse_case_to_case"],
            ["parse_legislation_to_cases"],
        ]),
    ]
}

/// Load datastore parameters, wrap the trigger payload, and dispatch
/// one worker operation.
pub(crate) async fn dispatch_step(
    deps: &TaskDeps,
    ctx: &TaskContext,
    operation: &str,
) -> Result<(), TaskError> {
    let datastore = DatastoreParams::load(deps.params.as_ref()).await?;
    let command = WorkerCommand::new(
        operation,
        serde_json::json!({
            "datastore": datastore,
            "event": ctx.input,
        }),
    );
    deps.channel.dispatch(command).await?;
    Ok(())
}
