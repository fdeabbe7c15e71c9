//! Search Agent
//!
//! Tool-calling reasoning loop, per-thread memory and the translation of
//! thread messages into relay events.

pub mod adapter;
pub mod checkpointer;
pub mod error;
pub mod prompts;
pub mod response;
pub mod service;

#[cfg(test)]
pub mod test_helpers;

pub use adapter::{AgentEvent, AgentMessage, MessageClassifier};
pub use checkpointer::{Checkpointer, MemoryCheckpointer, ThreadState};
pub use error::{AgentError, Result};
pub use response::{AgentResponse, StructuredResponse, StructuredStatus, get_agent_response};
pub use service::{AgentStream, SearchAgent};
