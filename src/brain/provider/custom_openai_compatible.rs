//! OpenAI-Compatible Provider Implementation
//!
//! Implements the Provider trait for any endpoint that speaks the OpenAI chat
//! completions protocol (official OpenAI, OpenRouter, local LLM servers).

use super::error::{ProviderError, Result};
use super::retry::{RetryConfig, retry_with_backoff};
use super::r#trait::Provider;
use super::types::*;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

pub(super) fn http_client() -> Client {
    Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .pool_idle_timeout(DEFAULT_POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(2)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {}", e);
            Client::new()
        })
}

/// OpenAI provider for GPT models
#[derive(Clone)]
pub struct OpenAIProvider {
    api_key: String,
    base_url: String,
    client: Client,
    custom_default_model: Option<String>,
    name: String,
    retry: RetryConfig,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with official API
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_OPENAI_API_URL.to_string(),
            client: http_client(),
            custom_default_model: None,
            name: "openai".to_string(),
            retry: RetryConfig::default(),
        }
    }

    /// Create with custom base URL
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            base_url,
            name: "openai-compatible".to_string(),
            ..Self::new(api_key)
        }
    }

    /// Set custom default model
    pub fn with_default_model(mut self, model: String) -> Self {
        self.custom_default_model = Some(model);
        self
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let clean_key = self.api_key.trim();
        if !clean_key.is_empty() {
            let value = HeaderValue::from_str(&format!("Bearer {}", clean_key)).map_err(|_| {
                tracing::error!(
                    "API key contains invalid characters (length={})",
                    clean_key.len()
                );
                ProviderError::InvalidApiKey
            })?;
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// Convert our generic request to OpenAI-specific format
    fn to_openai_request(&self, request: LLMRequest) -> OpenAIRequest {
        let mut messages = Vec::new();

        if let Some(system) = request.system {
            messages.push(OpenAIMessage::plain("system", system));
        }

        for msg in request.messages {
            let role = match msg.role {
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::System => "system",
            };

            let mut text_parts = Vec::new();
            let mut tool_uses = Vec::new();
            let mut tool_results = Vec::new();

            for block in msg.content {
                match block {
                    ContentBlock::Text { text } => text_parts.push(text),
                    ContentBlock::ToolUse { id, name, input } => tool_uses.push((id, name, input)),
                    ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                        ..
                    } => tool_results.push((tool_use_id, content)),
                }
            }

            if !tool_uses.is_empty() {
                let tool_calls = tool_uses
                    .into_iter()
                    .map(|(id, name, input)| OpenAIToolCall {
                        id,
                        r#type: "function".to_string(),
                        function: OpenAIFunctionCall {
                            name,
                            arguments: serde_json::to_string(&input).unwrap_or_default(),
                        },
                    })
                    .collect();
                messages.push(OpenAIMessage {
                    role: role.to_string(),
                    content: (!text_parts.is_empty()).then(|| text_parts.join("\n")),
                    tool_calls: Some(tool_calls),
                    tool_call_id: None,
                });
            } else if !tool_results.is_empty() {
                for (tool_use_id, content) in tool_results {
                    messages.push(OpenAIMessage {
                        role: "tool".to_string(),
                        content: Some(content),
                        tool_calls: None,
                        tool_call_id: Some(tool_use_id),
                    });
                }
            } else {
                messages.push(OpenAIMessage::plain(role, text_parts.join("\n")));
            }
        }

        let tools = request.tools.map(|tools| {
            tools
                .into_iter()
                .map(|tool| OpenAITool {
                    r#type: "function".to_string(),
                    function: OpenAIFunction {
                        name: tool.name,
                        description: tool.description,
                        parameters: tool.input_schema,
                    },
                })
                .collect()
        });

        let tool_choice = request.tool_choice.map(|choice| match choice {
            ToolChoice::Auto => serde_json::json!("auto"),
            ToolChoice::Tool(name) => serde_json::json!({
                "type": "function",
                "function": { "name": name }
            }),
        });

        OpenAIRequest {
            model: request.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            tools,
            tool_choice,
        }
    }

    /// Convert OpenAI response to our generic format
    #[allow(clippy::wrong_self_convention)]
    fn from_openai_response(&self, response: OpenAIResponse) -> Result<LLMResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)?;

        let mut content = Vec::new();
        if let Some(text) = choice.message.content
            && !text.is_empty()
        {
            content.push(ContentBlock::Text { text });
        }

        for tool_call in choice.message.tool_calls.unwrap_or_default() {
            let input = serde_json::from_str(&tool_call.function.arguments).unwrap_or_else(|e| {
                tracing::warn!(
                    "Failed to parse tool arguments for {}: {}",
                    tool_call.function.name,
                    e
                );
                serde_json::json!({})
            });
            content.push(ContentBlock::ToolUse {
                id: tool_call.id,
                name: tool_call.function.name,
                input,
            });
        }

        let stop_reason = choice
            .finish_reason
            .and_then(|reason| match reason.as_str() {
                "stop" => Some(StopReason::EndTurn),
                "length" => Some(StopReason::MaxTokens),
                "tool_calls" | "function_call" => Some(StopReason::ToolUse),
                _ => None,
            });

        let usage = response.usage.unwrap_or_default();
        Ok(LLMResponse {
            id: response.id,
            model: response.model,
            content,
            stop_reason,
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens.unwrap_or(0),
                output_tokens: usage.completion_tokens.unwrap_or(0),
            },
        })
    }

    /// Handle API error response
    async fn handle_error(&self, response: reqwest::Response) -> ProviderError {
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());

        let body = response.json::<OpenAIErrorResponse>().await.ok();
        let message = body
            .as_ref()
            .map(|b| b.error.message.clone())
            .unwrap_or_else(|| "Unknown error".to_string());

        if status == 429 {
            return ProviderError::RateLimitExceeded(match retry_after {
                Some(secs) => format!("{} (retry after {} seconds)", message, secs),
                None => message,
            });
        }
        if status == 401 {
            return ProviderError::InvalidApiKey;
        }
        ProviderError::ApiError {
            status,
            message,
            error_type: body.and_then(|b| b.error.error_type),
        }
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    async fn complete(&self, request: LLMRequest) -> Result<LLMResponse> {
        let model = request.model.clone();
        let message_count = request.messages.len();
        let openai_request = self.to_openai_request(request);
        let tool_count = openai_request.tools.as_ref().map(|t| t.len()).unwrap_or(0);

        tracing::info!(
            "{} API request: model={}, messages={}, tools={}",
            self.name,
            model,
            message_count,
            tool_count
        );

        let result = retry_with_backoff(
            || async {
                let response = self
                    .client
                    .post(&self.base_url)
                    .headers(self.headers()?)
                    .json(&openai_request)
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Err(self.handle_error(response).await);
                }

                let openai_response: OpenAIResponse = response.json().await?;
                self.from_openai_response(openai_response)
            },
            &self.retry,
        )
        .await;

        match &result {
            Ok(r) => tracing::debug!(
                "{} API response: input_tokens={}, output_tokens={}, stop_reason={:?}",
                self.name,
                r.usage.input_tokens,
                r.usage.output_tokens,
                r.stop_reason
            ),
            Err(e) => tracing::error!("{} API request failed: {}", self.name, e),
        }
        result
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> &str {
        self.custom_default_model
            .as_deref()
            .unwrap_or(DEFAULT_OPENAI_MODEL)
    }
}

// ============================================================================
// OpenAI API Types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl OpenAIMessage {
    fn plain(role: &str, content: String) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIToolCall {
    id: String,
    r#type: String,
    function: OpenAIFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAITool {
    r#type: String,
    function: OpenAIFunction,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIResponse {
    id: String,
    model: String,
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIError {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_for(server: &mockito::ServerGuard) -> OpenAIProvider {
        OpenAIProvider::with_base_url(
            "test-key".to_string(),
            format!("{}/v1/chat/completions", server.url()),
        )
        .with_retry_config(RetryConfig::none())
    }

    #[test]
    fn test_openai_provider_creation() {
        let provider = OpenAIProvider::new("test-key".to_string());
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.base_url, DEFAULT_OPENAI_API_URL);
        assert_eq!(provider.default_model(), "gpt-4o-mini");
    }

    #[test]
    fn test_request_maps_tool_history() {
        let provider = OpenAIProvider::new("k".to_string());
        let request = LLMRequest::new(
            "gpt-4o-mini",
            vec![
                Message::user("Who is Leo Messi?"),
                Message::assistant(vec![ContentBlock::ToolUse {
                    id: "call_1".to_string(),
                    name: "tavily_search".to_string(),
                    input: serde_json::json!({"query": "Leo Messi"}),
                }]),
                Message::tool_result("call_1", "{\"results\":[]}", false),
            ],
        )
        .with_system("be brief")
        .with_tool_choice(ToolChoice::Tool("structured_response".to_string()));

        let body = serde_json::to_value(provider.to_openai_request(request)).expect("json");
        let messages = body["messages"].as_array().expect("messages");
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(
            messages[2]["tool_calls"][0]["function"]["arguments"],
            "{\"query\":\"Leo Messi\"}"
        );
        assert_eq!(messages[3]["role"], "tool");
        assert_eq!(messages[3]["tool_call_id"], "call_1");
        assert_eq!(
            body["tool_choice"]["function"]["name"],
            "structured_response"
        );
    }

    #[tokio::test]
    async fn test_complete_parses_tool_calls() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "id": "chatcmpl-1",
                    "model": "gpt-4o-mini",
                    "choices": [{
                        "index": 0,
                        "message": {
                            "role": "assistant",
                            "content": null,
                            "tool_calls": [{
                                "id": "call_1",
                                "type": "function",
                                "function": {"name": "tavily_search", "arguments": "{\"query\":\"rust\"}"}
                            }]
                        },
                        "finish_reason": "tool_calls"
                    }],
                    "usage": {"prompt_tokens": 12, "completion_tokens": 3}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let response = provider_for(&server)
            .complete(LLMRequest::new("gpt-4o-mini", vec![Message::user("rust?")]))
            .await
            .expect("response");

        mock.assert_async().await;
        assert_eq!(response.stop_reason, Some(StopReason::ToolUse));
        assert_eq!(response.usage.input_tokens, 12);
        let calls = response.tool_uses();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, "tavily_search");
        assert_eq!(calls[0].2["query"], "rust");
    }

    #[tokio::test]
    async fn test_rate_limit_maps_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_header("retry-after", "7")
            .with_body(r#"{"error":{"message":"Too many requests","type":"rate_limit"}}"#)
            .create_async()
            .await;

        let err = provider_for(&server)
            .complete(LLMRequest::new("gpt-4o-mini", vec![Message::user("hi")]))
            .await
            .expect_err("should fail");
        match err {
            ProviderError::RateLimitExceeded(msg) => assert!(msg.contains("retry after 7")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
