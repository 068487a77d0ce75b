use async_trait::async_trait;
use casecore::TaskError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

/// An operation for the long-running worker fleet to execute against
/// the shared dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerCommand {
    pub operation: String,
    pub params: serde_json::Value,
}

impl WorkerCommand {
    pub fn new(operation: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            operation: operation.into(),
            params,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Command dispatch failed: {0}")]
    Dispatch(String),

    #[error("Worker rejected command: {0}")]
    Rejected(String),
}

impl From<ChannelError> for TaskError {
    fn from(e: ChannelError) -> Self {
        TaskError::Handler(e.to_string())
    }
}

/// Side-channel to the worker processes that hold the dataset open.
///
/// The orchestration core only needs dispatch-and-await-acknowledgment
/// semantics; the transport behind this trait is an external
/// collaborator.
#[async_trait]
pub trait CommandChannel: Send + Sync {
    async fn dispatch(&self, command: WorkerCommand) -> Result<(), ChannelError>;
}

/// In-process channel for tests and demos: records every dispatched
/// command and acknowledges immediately, with optional scripted
/// failures and delays per operation.
#[derive(Default)]
pub struct InMemoryCommandChannel {
    dispatched: Mutex<Vec<WorkerCommand>>,
    failures: Mutex<HashMap<String, String>>,
    delays: Mutex<HashMap<String, Duration>>,
}

impl InMemoryCommandChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a failure for an operation name.
    pub fn fail_operation(&self, operation: impl Into<String>, reason: impl Into<String>) {
        self.failures
            .lock()
            .expect("failures lock poisoned")
            .insert(operation.into(), reason.into());
    }

    /// Script an acknowledgment delay for an operation name.
    pub fn delay_operation(&self, operation: impl Into<String>, delay: Duration) {
        self.delays
            .lock()
            .expect("delays lock poisoned")
            .insert(operation.into(), delay);
    }

    /// Operations dispatched so far, in dispatch order.
    pub fn operations(&self) -> Vec<String> {
        self.dispatched
            .lock()
            .expect("dispatched lock poisoned")
            .iter()
            .map(|c| c.operation.clone())
            .collect()
    }

    pub fn commands(&self) -> Vec<WorkerCommand> {
        self.dispatched
            .lock()
            .expect("dispatched lock poisoned")
            .clone()
    }
}

#[async_trait]
impl CommandChannel for InMemoryCommandChannel {
    async fn dispatch(&self, command: WorkerCommand) -> Result<(), ChannelError> {
        let delay = self
            .delays
            .lock()
            .expect("delays lock poisoned")
            .get(&command.operation)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self
            .failures
            .lock()
            .expect("failures lock poisoned")
            .get(&command.operation)
            .cloned();
        if let Some(reason) = failure {
            return Err(ChannelError::Rejected(reason));
        }

        tracing::debug!(operation = %command.operation, "Acknowledging worker command");
        self.dispatched
            .lock()
            .expect("dispatched lock poisoned")
            .push(command);
        Ok(())
    }
}
