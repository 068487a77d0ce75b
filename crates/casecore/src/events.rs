use crate::{RunId, RunStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events emitted while a run progresses. This broadcast feed is the
/// only surface through which run outcomes are observable; the trigger
/// boundary itself reports accept/reject only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunEvent {
    RunStarted {
        run_id: RunId,
        workflow: String,
        timestamp: DateTime<Utc>,
    },
    RunCompleted {
        run_id: RunId,
        status: RunStatus,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    TaskStarted {
        run_id: RunId,
        task: String,
        timestamp: DateTime<Utc>,
    },
    TaskCompleted {
        run_id: RunId,
        task: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    TaskFailed {
        run_id: RunId,
        task: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    TaskMessage {
        run_id: RunId,
        task: String,
        message: TaskMessage,
        timestamp: DateTime<Utc>,
    },
}

/// Progress messages a handler can emit mid-invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "level")]
pub enum TaskMessage {
    Info { message: String },
    Warning { message: String },
}

/// Emitter handed to task handlers for real-time progress updates.
#[derive(Clone)]
pub struct TaskEmitter {
    run_id: RunId,
    task: String,
    sender: broadcast::Sender<RunEvent>,
}

impl TaskEmitter {
    pub fn new(run_id: RunId, task: impl Into<String>, sender: broadcast::Sender<RunEvent>) -> Self {
        Self {
            run_id,
            task: task.into(),
            sender,
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.send(TaskMessage::Info {
            message: message.into(),
        });
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.send(TaskMessage::Warning {
            message: message.into(),
        });
    }

    fn send(&self, message: TaskMessage) {
        let _ = self.sender.send(RunEvent::TaskMessage {
            run_id: self.run_id,
            task: self.task.clone(),
            message,
            timestamp: Utc::now(),
        });
    }
}

/// Global event bus backed by a tokio broadcast channel. Emission never
/// blocks; events are dropped when there are no subscribers.
pub struct EventBus {
    sender: broadcast::Sender<RunEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: RunEvent) {
        let _ = self.sender.send(event);
    }

    pub fn create_emitter(&self, run_id: RunId, task: impl Into<String>) -> TaskEmitter {
        TaskEmitter::new(run_id, task, self.sender.clone())
    }
}
