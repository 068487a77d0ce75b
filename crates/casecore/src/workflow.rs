use crate::TaskSpec;
use serde::{Deserialize, Serialize};

/// Compiled workflow tree. Acyclic by construction; every leaf is a
/// task. A `Parallel` node's children are its branches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum WorkflowNode {
    Task(TaskSpec),
    Sequence(Vec<WorkflowNode>),
    Parallel(Vec<WorkflowNode>),
}

impl WorkflowNode {
    /// Names of every task leaf, in depth-first order.
    pub fn task_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            WorkflowNode::Task(spec) => names.push(&spec.name),
            WorkflowNode::Sequence(children) | WorkflowNode::Parallel(children) => {
                for child in children {
                    child.collect_names(names);
                }
            }
        }
    }
}

/// Immutable workflow definition. Built once by the compiler and reused
/// by every run for the lifetime of the process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowDefinition {
    pub name: String,
    pub root: WorkflowNode,
}

impl WorkflowDefinition {
    pub fn task_count(&self) -> usize {
        self.root.task_names().len()
    }
}

/// Declarative stage descriptor fed to the compiler: a single task
/// name, or a set of branches each holding its own ordered stage list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value")]
pub enum Stage {
    Task(String),
    Parallel(Vec<Vec<Stage>>),
}

impl Stage {
    pub fn task(name: impl Into<String>) -> Self {
        Stage::Task(name.into())
    }

    /// Convenience for branches that are each a flat list of task names.
    pub fn parallel_tasks<I, B, N>(branches: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: IntoIterator<Item = N>,
        N: Into<String>,
    {
        Stage::Parallel(
            branches
                .into_iter()
                .map(|b| b.into_iter().map(|n| Stage::Task(n.into())).collect())
                .collect(),
        )
    }
}

/// A named stage list as loaded from a pipeline file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineSpec {
    pub name: String,
    pub stages: Vec<Stage>,
}
