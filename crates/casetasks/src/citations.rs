use crate::{dispatch_step, TaskDeps};
use async_trait::async_trait;
use casecore::{TaskContext, TaskError, TaskHandler};

/// Extracts footnote citations from the normalized case texts. Safe to
/// run alongside the empty-citation pass; the two touch disjoint
/// columns.
pub struct ParseFootnotesTask {
    deps: TaskDeps,
}

impl ParseFootnotesTask {
    pub fn new(deps: TaskDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl TaskHandler for ParseFootnotesTask {
    fn name(&self) -> &str {
        "parse_footnotes"
    }

    async fn execute(&self, ctx: TaskContext) -> Result<(), TaskError> {
        ctx.events.info("Extracting footnote citations");
        dispatch_step(&self.deps, &ctx, "parse_footnotes").await
    }
}

/// Backfills citation records for cases that were ingested without one.
pub struct ParseEmptyCitationsTask {
    deps: TaskDeps,
}

impl ParseEmptyCitationsTask {
    pub fn new(deps: TaskDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl TaskHandler for ParseEmptyCitationsTask {
    fn name(&self) -> &str {
        "parse_empty_citations"
    }

    async fn execute(&self, ctx: TaskContext) -> Result<(), TaskError> {
        ctx.events.info("Backfilling missing citations");
        dispatch_step(&self.deps, &ctx, "parse_empty_citations").await
    }
}
