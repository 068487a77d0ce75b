use crate::{dispatch_step, TaskDeps};
use async_trait::async_trait;
use casecore::{TaskContext, TaskError, TaskHandler};

/// Resets every case row to its freshly ingested state so the parsing
/// steps downstream start from a clean slate. Runs first and alone.
pub struct ResetCasesTask {
    deps: TaskDeps,
}

impl ResetCasesTask {
    pub fn new(deps: TaskDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl TaskHandler for ResetCasesTask {
    fn name(&self) -> &str {
        "reset_cases"
    }

    async fn execute(&self, ctx: TaskContext) -> Result<(), TaskError> {
        ctx.events.info("Resetting case rows to ingested state");
        dispatch_step(&self.deps, &ctx, "reset_cases").await
    }
}
