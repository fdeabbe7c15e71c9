//! Provider error types.

use thiserror::Error;

/// Result alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors raised while talking to an LLM API.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error ({status}): {message}")]
    ApiError {
        status: u16,
        message: String,
        error_type: Option<String>,
    },

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Missing API key for provider '{0}'")]
    MissingApiKey(String),

    #[error("Empty response from provider")]
    EmptyResponse,
}

impl ProviderError {
    /// Whether retrying the same request might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimitExceeded(_) => true,
            Self::ApiError { status, .. } => *status >= 500 || *status == 408 || *status == 529,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
