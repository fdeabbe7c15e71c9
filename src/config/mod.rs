//! Configuration Module
//!
//! Handles configuration loading (TOML files + environment) for the relay
//! and the question-answering service.

pub mod secrets;
mod types;

pub use secrets::SecretString;
pub use types::*;
