use crate::registry::TaskRegistry;
use casecore::{CompileError, Stage, WorkflowDefinition, WorkflowNode};
use std::collections::HashSet;

/// Compile a declarative stage list into an immutable workflow tree.
///
/// Validation happens up front: every referenced task must exist in the
/// registry, and no task name may appear twice in the same workflow.
/// On any error nothing is returned; a definition is never partially
/// built.
pub fn compile(
    name: &str,
    stages: &[Stage],
    registry: &TaskRegistry,
) -> Result<WorkflowDefinition, CompileError> {
    if stages.is_empty() {
        return Err(CompileError::EmptyPipeline);
    }

    let mut seen = HashSet::new();
    let root = WorkflowNode::Sequence(compile_stages(stages, registry, &mut seen)?);

    tracing::debug!(
        workflow = name,
        tasks = seen.len(),
        "Compiled workflow definition"
    );

    Ok(WorkflowDefinition {
        name: name.to_string(),
        root,
    })
}

fn compile_stages(
    stages: &[Stage],
    registry: &TaskRegistry,
    seen: &mut HashSet<String>,
) -> Result<Vec<WorkflowNode>, CompileError> {
    stages
        .iter()
        .map(|stage| compile_stage(stage, registry, seen))
        .collect()
}

fn compile_stage(
    stage: &Stage,
    registry: &TaskRegistry,
    seen: &mut HashSet<String>,
) -> Result<WorkflowNode, CompileError> {
    match stage {
        Stage::Task(name) => {
            let spec = registry
                .spec(name)
                .map_err(|_| CompileError::UnresolvedTask(name.clone()))?;
            if !seen.insert(name.clone()) {
                return Err(CompileError::DuplicateNodeReference(name.clone()));
            }
            Ok(WorkflowNode::Task(spec))
        }
        Stage::Parallel(branches) => {
            if branches.is_empty() || branches.iter().any(|b| b.is_empty()) {
                return Err(CompileError::EmptyParallel);
            }
            let compiled = branches
                .iter()
                .map(|branch| Ok(WorkflowNode::Sequence(compile_stages(branch, registry, seen)?)))
                .collect::<Result<Vec<_>, CompileError>>()?;
            Ok(WorkflowNode::Parallel(compiled))
        }
    }
}
