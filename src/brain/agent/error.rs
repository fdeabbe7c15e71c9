use crate::brain::provider::ProviderError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors that abort an agent run.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Agent task aborted: {0}")]
    Aborted(String),
}
