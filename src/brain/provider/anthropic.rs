//! Anthropic Messages API provider.

use super::custom_openai_compatible::http_client;
use super::error::{ProviderError, Result};
use super::retry::{RetryConfig, retry_with_backoff};
use super::r#trait::Provider;
use super::types::*;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic provider for Claude models
#[derive(Clone)]
pub struct AnthropicProvider {
    api_key: String,
    base_url: String,
    client: Client,
    custom_default_model: Option<String>,
    retry: RetryConfig,
}

impl AnthropicProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_ANTHROPIC_API_URL.to_string(),
            client: http_client(),
            custom_default_model: None,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_default_model(mut self, model: String) -> Self {
        self.custom_default_model = Some(model);
        self
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn headers(&self) -> Result<HeaderMap> {
        let key = self.api_key.trim();
        if key.is_empty() {
            return Err(ProviderError::MissingApiKey("anthropic".to_string()));
        }
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(key).map_err(|_| ProviderError::InvalidApiKey)?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn to_anthropic_request(&self, request: LLMRequest) -> AnthropicRequest {
        // System turns are carried in the top-level `system` field
        let mut system = request.system;
        let mut messages = Vec::with_capacity(request.messages.len());
        for msg in request.messages {
            match msg.role {
                Role::System => {
                    let text = msg.text();
                    system = Some(match system {
                        Some(existing) => format!("{}\n\n{}", existing, text),
                        None => text,
                    });
                }
                Role::User | Role::Assistant => messages.push(AnthropicMessage {
                    role: if msg.role == Role::User {
                        "user"
                    } else {
                        "assistant"
                    }
                    .to_string(),
                    content: msg.content,
                }),
            }
        }

        AnthropicRequest {
            model: request.model,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages,
            temperature: request.temperature,
            tools: request.tools,
            tool_choice: request.tool_choice.map(|choice| match choice {
                ToolChoice::Auto => serde_json::json!({"type": "auto"}),
                ToolChoice::Tool(name) => serde_json::json!({"type": "tool", "name": name}),
            }),
        }
    }

    #[allow(clippy::wrong_self_convention)]
    fn from_anthropic_response(&self, response: AnthropicResponse) -> LLMResponse {
        let stop_reason = response
            .stop_reason
            .as_deref()
            .and_then(|reason| match reason {
                "end_turn" => Some(StopReason::EndTurn),
                "max_tokens" => Some(StopReason::MaxTokens),
                "stop_sequence" => Some(StopReason::StopSequence),
                "tool_use" => Some(StopReason::ToolUse),
                _ => None,
            });

        let content = response
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicContent::Text { text } => Some(ContentBlock::Text { text }),
                AnthropicContent::ToolUse { id, name, input } => {
                    Some(ContentBlock::ToolUse { id, name, input })
                }
                AnthropicContent::Other => None,
            })
            .collect();

        LLMResponse {
            id: response.id,
            model: response.model,
            content,
            stop_reason,
            usage: TokenUsage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
            },
        }
    }

    async fn handle_error(&self, response: reqwest::Response) -> ProviderError {
        let status = response.status().as_u16();
        let body = response.json::<AnthropicErrorResponse>().await.ok();
        let message = body
            .as_ref()
            .map(|b| b.error.message.clone())
            .unwrap_or_else(|| "Unknown error".to_string());

        match status {
            401 => ProviderError::InvalidApiKey,
            429 => ProviderError::RateLimitExceeded(message),
            _ => ProviderError::ApiError {
                status,
                message,
                error_type: body.map(|b| b.error.error_type),
            },
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn complete(&self, request: LLMRequest) -> Result<LLMResponse> {
        let body = self.to_anthropic_request(request);
        tracing::info!(
            "Anthropic API request: model={}, messages={}, tools={}",
            body.model,
            body.messages.len(),
            body.tools.as_ref().map(|t| t.len()).unwrap_or(0)
        );

        let result = retry_with_backoff(
            || async {
                let response = self
                    .client
                    .post(&self.base_url)
                    .headers(self.headers()?)
                    .json(&body)
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Err(self.handle_error(response).await);
                }

                let parsed: AnthropicResponse = response.json().await?;
                Ok(self.from_anthropic_response(parsed))
            },
            &self.retry,
        )
        .await;

        if let Err(ref e) = result {
            tracing::error!("Anthropic API request failed: {}", e);
        }
        result
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    fn default_model(&self) -> &str {
        self.custom_default_model
            .as_deref()
            .unwrap_or(DEFAULT_ANTHROPIC_MODEL)
    }
}

// ============================================================================
// Anthropic API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    id: String,
    model: String,
    content: Vec<AnthropicContent>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContent {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorResponse {
    error: AnthropicError,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_for(server: &mockito::ServerGuard) -> AnthropicProvider {
        AnthropicProvider::new("sk-ant-test".to_string())
            .with_base_url(format!("{}/v1/messages", server.url()))
            .with_retry_config(RetryConfig::none())
    }

    #[test]
    fn test_system_messages_fold_into_system_field() {
        let provider = AnthropicProvider::new("k".to_string());
        let request = LLMRequest::new(
            DEFAULT_ANTHROPIC_MODEL,
            vec![
                Message {
                    role: Role::System,
                    content: vec![ContentBlock::Text {
                        text: "format rules".to_string(),
                    }],
                },
                Message::user("hello"),
            ],
        )
        .with_system("base prompt")
        .with_tool_choice(ToolChoice::Tool("structured_response".to_string()));

        let body = serde_json::to_value(provider.to_anthropic_request(request)).expect("json");
        assert_eq!(body["system"], "base prompt\n\nformat rules");
        assert_eq!(body["messages"].as_array().map(|m| m.len()), Some(1));
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["tool_choice"]["type"], "tool");
        assert_eq!(body["tool_choice"]["name"], "structured_response");
    }

    #[tokio::test]
    async fn test_complete_parses_mixed_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "sk-ant-test")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "id": "msg_01",
                    "type": "message",
                    "role": "assistant",
                    "model": DEFAULT_ANTHROPIC_MODEL,
                    "content": [
                        {"type": "text", "text": "Let me search for that."},
                        {"type": "tool_use", "id": "toolu_01", "name": "tavily_search", "input": {"query": "Leo Messi"}}
                    ],
                    "stop_reason": "tool_use",
                    "usage": {"input_tokens": 40, "output_tokens": 18}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let response = provider_for(&server)
            .complete(LLMRequest::new(
                DEFAULT_ANTHROPIC_MODEL,
                vec![Message::user("Who is Leo Messi?")],
            ))
            .await
            .expect("response");

        mock.assert_async().await;
        assert_eq!(response.id, "msg_01");
        assert_eq!(response.stop_reason, Some(StopReason::ToolUse));
        assert_eq!(response.text(), "Let me search for that.");
        assert_eq!(response.tool_uses()[0].0, "toolu_01");
    }

    #[tokio::test]
    async fn test_missing_key_is_reported() {
        let provider = AnthropicProvider::new("  ".to_string()).with_retry_config(RetryConfig::none());
        let err = provider
            .complete(LLMRequest::new(DEFAULT_ANTHROPIC_MODEL, vec![Message::user("hi")]))
            .await
            .expect_err("no key");
        assert!(matches!(err, ProviderError::MissingApiKey(_)));
    }

    #[tokio::test]
    async fn test_server_error_surfaces_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(500)
            .with_body(r#"{"type":"error","error":{"type":"api_error","message":"boom"}}"#)
            .create_async()
            .await;

        let err = provider_for(&server)
            .complete(LLMRequest::new(DEFAULT_ANTHROPIC_MODEL, vec![Message::user("hi")]))
            .await
            .expect_err("500");
        match err {
            ProviderError::ApiError { status, message, .. } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
