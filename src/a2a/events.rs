//! Event queue between an executor and the request handler, and the
//! aggregator that folds events into the stored task.

use super::error::{A2aError, Result};
use super::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};

/// In-memory task store.
pub type TaskStore = Arc<RwLock<HashMap<String, Task>>>;

pub fn new_task_store() -> TaskStore {
    Arc::new(RwLock::new(HashMap::new()))
}

/// Per-request queue of events produced by an executor.
#[derive(Debug, Clone)]
pub struct EventQueue {
    tx: mpsc::Sender<StreamEvent>,
}

impl EventQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    pub async fn enqueue_event(&self, event: impl Into<StreamEvent>) -> Result<()> {
        self.tx
            .send(event.into())
            .await
            .map_err(|_| A2aError::QueueClosed)
    }
}

/// Applies queued events to the task store.
#[derive(Clone)]
pub struct ResultAggregator {
    store: TaskStore,
}

impl ResultAggregator {
    pub fn new(store: TaskStore) -> Self {
        Self { store }
    }

    /// Fold one event into its task. Returns the updated task, `None` for
    /// direct messages and events for unknown tasks.
    pub async fn apply(&self, event: &StreamEvent) -> Option<Task> {
        let mut tasks = self.store.write().await;
        match event {
            StreamEvent::Task(task) => {
                tasks.insert(task.id.clone(), task.clone());
                Some(task.clone())
            }
            StreamEvent::Message(_) => None,
            StreamEvent::StatusUpdate(update) => {
                let Some(task) = tasks.get_mut(&update.task_id) else {
                    tracing::warn!("Status update for unknown task {}", update.task_id);
                    return None;
                };
                // The replaced status message moves into history
                if let Some(previous) = task.status.message.take() {
                    task.history.push(previous);
                }
                let mut status = update.status.clone();
                if status.timestamp.is_none() {
                    status.timestamp = Some(chrono::Utc::now().to_rfc3339());
                }
                task.status = status;
                if let Some(metadata) = &update.metadata {
                    task.metadata
                        .get_or_insert_with(HashMap::new)
                        .extend(metadata.clone());
                }
                Some(task.clone())
            }
            StreamEvent::ArtifactUpdate(update) => {
                let Some(task) = tasks.get_mut(&update.task_id) else {
                    tracing::warn!("Artifact update for unknown task {}", update.task_id);
                    return None;
                };
                let existing = task
                    .artifacts
                    .iter_mut()
                    .find(|a| a.artifact_id == update.artifact.artifact_id);
                match (existing, update.append.unwrap_or(false)) {
                    (Some(artifact), true) => {
                        artifact.parts.extend(update.artifact.parts.iter().cloned());
                    }
                    (Some(artifact), false) => *artifact = update.artifact.clone(),
                    (None, true) => {
                        tracing::warn!(
                            "Append to unknown artifact {} on task {}, ignoring",
                            update.artifact.artifact_id,
                            update.task_id
                        );
                    }
                    (None, false) => task.artifacts.push(update.artifact.clone()),
                }
                Some(task.clone())
            }
        }
    }
}
