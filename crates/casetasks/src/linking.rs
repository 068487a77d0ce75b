use crate::{dispatch_step, TaskDeps};
use async_trait::async_trait;
use casecore::{TaskContext, TaskError, TaskHandler};

/// Builds the case-to-case citation graph from the extracted citations.
/// Order-independent with respect to the other linking passes.
pub struct ParseCaseToCaseTask {
    deps: TaskDeps,
}

impl ParseCaseToCaseTask {
    pub fn new(deps: TaskDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl TaskHandler for ParseCaseToCaseTask {
    fn name(&self) -> &str {
        "parse_case_to_case"
    }

    async fn execute(&self, ctx: TaskContext) -> Result<(), TaskError> {
        ctx.events.info("Linking case-to-case citations");
        dispatch_step(&self.deps, &ctx, "parse_case_to_case").await
    }
}

/// Links statute references in case texts to legislation records.
pub struct ParseLegislationToCasesTask {
    deps: TaskDeps,
}

impl ParseLegislationToCasesTask {
    pub fn new(deps: TaskDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl TaskHandler for ParseLegislationToCasesTask {
    fn name(&self) -> &str {
        "parse_legislation_to_cases"
    }

    async fn execute(&self, ctx: TaskContext) -> Result<(), TaskError> {
        ctx.events.info("Linking legislation references");
        dispatch_step(&self.deps, &ctx, "parse_legislation_to_cases").await
    }
}
