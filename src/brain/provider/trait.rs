use super::error::Result;
use super::types::{LLMRequest, LLMResponse};
use async_trait::async_trait;

/// A chat-completion backend.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Run one non-streaming completion.
    async fn complete(&self, request: LLMRequest) -> Result<LLMResponse>;

    /// Provider name used in logs.
    fn name(&self) -> &str;

    /// Model used when the caller does not pick one.
    fn default_model(&self) -> &str;

    fn supports_tools(&self) -> bool {
        true
    }
}
