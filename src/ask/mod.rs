//! Question-answering service.
//!
//! A single-shot chat-completion endpoint (`POST /ask`) instrumented with
//! spans and metrics, plus a health check.

pub mod server;

pub use server::{AskState, build_router, start_ask_server};
