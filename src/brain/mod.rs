//! Brain Module
//!
//! The search agent, its LLM providers, and its tools.

pub mod agent;
pub mod provider;
pub mod tools;
