use crate::{compiler, engine::ExecutionEngine, registry::TaskRegistry};
use casecore::{
    CompileError, EngineError, EventBus, RunContext, RunEvent, RunId, Stage, WorkflowDefinition,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Facade owning the registry, engine, event bus, and the table of
/// compiled workflow definitions. This is what the gateway and CLI
/// talk to.
pub struct PipelineRuntime {
    registry: Arc<TaskRegistry>,
    engine: Arc<ExecutionEngine>,
    events: Arc<EventBus>,
    workflows: RwLock<HashMap<String, Arc<WorkflowDefinition>>>,
}

impl PipelineRuntime {
    /// Create a runtime around a pre-populated task registry.
    pub fn with_registry(registry: Arc<TaskRegistry>, config: RuntimeConfig) -> Self {
        let events = Arc::new(EventBus::new(config.event_buffer_size));
        let engine = Arc::new(ExecutionEngine::new(
            registry.clone(),
            events.clone(),
            config.max_concurrent_runs,
            config.max_run_history,
        ));

        Self {
            registry,
            engine,
            events,
            workflows: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Compile and store a pipeline. Compile errors are fatal: nothing
    /// is stored and the pipeline is not executable until fixed.
    pub async fn register_pipeline(
        &self,
        name: &str,
        stages: &[Stage],
    ) -> Result<(), CompileError> {
        let def = compiler::compile(name, stages, &self.registry)?;
        self.workflows
            .write()
            .await
            .insert(name.to_string(), Arc::new(def));
        tracing::info!(workflow = name, "Pipeline registered");
        Ok(())
    }

    /// Start a run of a registered pipeline without waiting for it to
    /// finish. This backs the trigger gateway's accept/reject boundary.
    pub async fn trigger(
        &self,
        name: &str,
        input: serde_json::Value,
    ) -> Result<RunId, EngineError> {
        let def = self.definition(name).await?;
        self.engine.start_run(def, input).await
    }

    /// Run a registered pipeline to completion (CLI and tests).
    pub async fn run_workflow(
        &self,
        name: &str,
        input: serde_json::Value,
    ) -> Result<RunContext, EngineError> {
        let def = self.definition(name).await?;
        self.engine.execute(def, input).await
    }

    pub async fn run_status(&self, run_id: RunId) -> Option<RunContext> {
        self.engine.run_status(run_id).await
    }

    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<RunEvent> {
        self.events.subscribe()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.events
    }

    async fn definition(&self, name: &str) -> Result<Arc<WorkflowDefinition>, EngineError> {
        self.workflows
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::WorkflowNotFound(name.to_string()))
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub event_buffer_size: usize,
    pub max_concurrent_runs: usize,
    /// Terminal run records kept for status lookup; the oldest are
    /// evicted past this cap. Active runs are never evicted.
    pub max_run_history: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
            max_concurrent_runs: 32,
            max_run_history: 1000,
        }
    }
}
