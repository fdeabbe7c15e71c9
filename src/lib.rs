//! Tavily Agent - A2A web search relay
//!
//! Exposes a tool-calling search agent over the A2A protocol. Each question
//! runs the agent against a Tavily-backed web search tool, and every step it
//! takes (messages, tool calls, tool results, the final answer) is relayed
//! to the client as task events.
//!
//! ## Features
//!
//! - **A2A relay:** agent card discovery, `message/send`, `message/stream` (SSE), `tasks/get`, `tasks/cancel`
//! - **Search agent:** Anthropic or OpenAI-compatible models with per-thread memory
//! - **Ask service:** single-shot Q/A endpoint with OTLP traces, metrics and logs
//!
//! ## Quick Start
//!
//! ```bash
//! # A2A relay on :10000
//! TAVILY_API_KEY=... OPENAI_API_KEY=... tavily-agent serve
//!
//! # Q/A service on :8000
//! OPENAI_API_KEY=... tavily-agent ask
//! ```

pub mod a2a;
pub mod ask;
pub mod brain;
pub mod cli;
pub mod config;
pub mod logging;
pub mod telemetry;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resolves on Ctrl+C. Servers use it for graceful shutdown.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
