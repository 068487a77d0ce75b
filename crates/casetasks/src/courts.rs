use crate::{dispatch_step, TaskDeps};
use async_trait::async_trait;
use casecore::{TaskContext, TaskError, TaskHandler};

/// Matches each case against the known court list and records the
/// issuing court. Requires the citation passes to have completed.
pub struct ParseCourtsTask {
    deps: TaskDeps,
}

impl ParseCourtsTask {
    pub fn new(deps: TaskDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl TaskHandler for ParseCourtsTask {
    fn name(&self) -> &str {
        "parse_courts"
    }

    async fn execute(&self, ctx: TaskContext) -> Result<(), TaskError> {
        ctx.events.info("Mapping cases to courts");
        dispatch_step(&self.deps, &ctx, "parse_courts").await
    }
}
