use super::error::Result;
use crate::brain::provider;
use async_trait::async_trait;
use serde_json::Value;

/// Outcome of one tool invocation. `output` becomes the tool message content.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
}

impl ToolResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn error(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// A function the agent may call mid-conversation.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the `input` object.
    fn input_schema(&self) -> Value;

    async fn execute(&self, input: Value) -> Result<ToolResult>;

    /// Definition advertised to the model.
    fn definition(&self) -> provider::Tool {
        provider::Tool {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}
