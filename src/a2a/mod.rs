//! A2A (Agent-to-Agent) protocol surface of the relay.
//!
//! - Agent Card discovery (`.well-known/agent.json`)
//! - JSON-RPC 2.0 task API (`message/send`, `message/stream`, `tasks/get`, `tasks/cancel`)
//! - Executor turning search-agent events into task events
//! - HTTP server (axum)

pub mod agent_card;
pub mod error;
pub mod events;
pub mod executor;
pub mod handler;
pub mod server;
pub mod types;

pub use error::A2aError;
pub use executor::{AgentExecutor, RequestContext, SearchAgentExecutor};
pub use server::start_server;
