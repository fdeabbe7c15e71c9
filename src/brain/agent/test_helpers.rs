//! Scripted provider and mock search tool shared by agent and A2A tests.

use super::SearchAgent;
use super::prompts::STRUCTURED_RESPONSE_TOOL;
use crate::brain::provider::{
    ContentBlock, LLMRequest, LLMResponse, Provider, ProviderError, StopReason, TokenUsage,
};
use crate::brain::tools::{Tool, ToolRegistry, ToolResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Provider that replays canned responses in order and records every request.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Vec<ContentBlock>>>,
    requests: Mutex<Vec<LLMRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Vec<ContentBlock>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<LLMRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn complete(&self, request: LLMRequest) -> crate::brain::provider::Result<LLMResponse> {
        self.requests.lock().unwrap().push(request);
        let content = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(ProviderError::EmptyResponse)?;
        Ok(LLMResponse {
            id: "resp".to_string(),
            model: "mock-model".to_string(),
            content,
            stop_reason: Some(StopReason::EndTurn),
            usage: TokenUsage::default(),
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }
}

/// Search tool returning one fixed result.
pub struct MockSearch;

#[async_trait]
impl Tool for MockSearch {
    fn name(&self) -> &str {
        "tavily_search"
    }

    fn description(&self) -> &str {
        "mock search"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({"type": "object"})
    }

    async fn execute(&self, input: Value) -> crate::brain::tools::Result<ToolResult> {
        Ok(ToolResult::success(
            serde_json::json!({
                "query": input["query"],
                "results": [{"title": "Lionel Messi", "url": "https://en.wikipedia.org/wiki/Lionel_Messi"}]
            })
            .to_string(),
        ))
    }
}

pub fn search_agent(provider: Arc<ScriptedProvider>) -> SearchAgent {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(MockSearch));
    SearchAgent::new(provider, Arc::new(registry))
}

pub fn text(t: &str) -> ContentBlock {
    ContentBlock::Text {
        text: t.to_string(),
    }
}

pub fn tool_use(id: &str, name: &str, input: Value) -> ContentBlock {
    ContentBlock::ToolUse {
        id: id.to_string(),
        name: name.to_string(),
        input,
    }
}

/// Model turn answering the structured-response request.
pub fn structured(status: &str, description: &str, output: &str) -> Vec<ContentBlock> {
    vec![tool_use(
        "structured",
        STRUCTURED_RESPONSE_TOOL,
        serde_json::json!({
            "status": status,
            "task_description": description,
            "task_output": output
        }),
    )]
}
