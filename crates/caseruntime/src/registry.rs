use casecore::{RegistryError, TaskHandler, TaskSpec};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

struct RegisteredTask {
    handler: Arc<dyn TaskHandler>,
    timeout: Duration,
}

/// Process-wide map from task name to handler. Built during startup,
/// then shared read-only with the compiler and invoker; there is no
/// removal operation.
pub struct TaskRegistry {
    tasks: HashMap<String, RegisteredTask>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    /// Register a handler under its own name with a per-invocation
    /// timeout.
    pub fn register(
        &mut self,
        handler: Arc<dyn TaskHandler>,
        timeout: Duration,
    ) -> Result<(), RegistryError> {
        let name = handler.name().to_string();
        if self.tasks.contains_key(&name) {
            return Err(RegistryError::DuplicateTaskName(name));
        }
        tracing::info!(task = %name, timeout_secs = timeout.as_secs(), "Registering task");
        self.tasks.insert(name, RegisteredTask { handler, timeout });
        Ok(())
    }

    /// Resolve a task name to its handler.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn TaskHandler>, RegistryError> {
        self.tasks
            .get(name)
            .map(|t| t.handler.clone())
            .ok_or_else(|| RegistryError::UnknownTask(name.to_string()))
    }

    /// Spec (name + timeout) for a registered task.
    pub fn spec(&self, name: &str) -> Result<TaskSpec, RegistryError> {
        self.tasks
            .get(name)
            .map(|t| TaskSpec::new(name, t.timeout))
            .ok_or_else(|| RegistryError::UnknownTask(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// All registered task names, sorted for stable listings.
    pub fn task_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tasks.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}
