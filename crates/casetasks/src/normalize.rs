use crate::{dispatch_step, TaskDeps};
use async_trait::async_trait;
use casecore::{TaskContext, TaskError, TaskHandler};

/// Strips invalid characters left over from PDF extraction out of the
/// case texts. Must complete before any of the citation or court
/// parsers run.
pub struct ParseInvalidCharactersTask {
    deps: TaskDeps,
}

impl ParseInvalidCharactersTask {
    pub fn new(deps: TaskDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl TaskHandler for ParseInvalidCharactersTask {
    fn name(&self) -> &str {
        "parse_invalid_characters"
    }

    async fn execute(&self, ctx: TaskContext) -> Result<(), TaskError> {
        ctx.events.info("Normalizing case text");
        dispatch_step(&self.deps, &ctx, "parse_invalid_characters").await
    }
}
