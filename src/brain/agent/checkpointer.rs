//! Conversation memory keyed by thread id.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::adapter::AgentMessage;
use super::error::Result;
use super::response::StructuredResponse;

/// Saved state of one conversation thread.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreadState {
    pub messages: Vec<AgentMessage>,
    pub structured_response: Option<StructuredResponse>,
}

/// Storage for thread state between runs.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// State of `thread_id`, empty when the thread is new.
    async fn load(&self, thread_id: &str) -> Result<ThreadState>;

    async fn save(&self, thread_id: &str, state: ThreadState) -> Result<()>;
}

/// Process-local checkpointer. State is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryCheckpointer {
    threads: RwLock<HashMap<String, ThreadState>>,
}

impl MemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for MemoryCheckpointer {
    async fn load(&self, thread_id: &str) -> Result<ThreadState> {
        Ok(self
            .threads
            .read()
            .await
            .get(thread_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save(&self, thread_id: &str, state: ThreadState) -> Result<()> {
        self.threads
            .write()
            .await
            .insert(thread_id.to_string(), state);
        Ok(())
    }
}
