//! Thread messages and their translation into relay events.

use crate::brain::provider::{ContentBlock, Message};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use super::response::AgentResponse;

/// One message in an agent thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentMessage {
    Human {
        id: String,
        content: String,
    },
    /// Model output: text blocks and tool calls.
    Ai {
        id: String,
        content: Vec<ContentBlock>,
    },
    /// Output of one tool call.
    Tool {
        id: String,
        tool_call_id: String,
        name: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl AgentMessage {
    pub fn id(&self) -> &str {
        match self {
            Self::Human { id, .. } | Self::Ai { id, .. } | Self::Tool { id, .. } => id,
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::Human {
            id: new_message_id(),
            content: content.into(),
        }
    }

    pub fn ai(content: Vec<ContentBlock>) -> Self {
        Self::Ai {
            id: new_message_id(),
            content,
        }
    }

    pub fn tool(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Self::Tool {
            id: new_message_id(),
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            content: content.into(),
            is_error,
        }
    }
}

fn new_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Convert a thread into provider messages.
///
/// Consecutive tool messages collapse into one user message so every tool
/// result of a turn travels together.
pub fn to_provider_messages(thread: &[AgentMessage]) -> Vec<Message> {
    let mut out: Vec<Message> = Vec::with_capacity(thread.len());
    let mut pending_results: Vec<ContentBlock> = Vec::new();

    let flush = |pending: &mut Vec<ContentBlock>, out: &mut Vec<Message>| {
        if !pending.is_empty() {
            out.push(Message {
                role: crate::brain::provider::Role::User,
                content: std::mem::take(pending),
            });
        }
    };

    for message in thread {
        match message {
            AgentMessage::Tool {
                tool_call_id,
                content,
                is_error,
                ..
            } => pending_results.push(ContentBlock::ToolResult {
                tool_use_id: tool_call_id.clone(),
                content: content.clone(),
                is_error: is_error.then_some(true),
            }),
            AgentMessage::Human { content, .. } => {
                flush(&mut pending_results, &mut out);
                out.push(Message::user(content.clone()));
            }
            AgentMessage::Ai { content, .. } => {
                flush(&mut pending_results, &mut out);
                out.push(Message::assistant(content.clone()));
            }
        }
    }
    flush(&mut pending_results, &mut out);
    out
}

/// Event produced by an agent run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    Message {
        content: String,
    },
    ToolCall {
        tool_call_id: String,
        tool_call_name: String,
        tool_call_args: Value,
    },
    ToolCallResult {
        tool_call_id: String,
        tool_call_name: String,
        tool_call_result: Value,
    },
    Response(AgentResponse),
}

/// Maps thread messages to events, skipping any message id already seen.
#[derive(Debug, Default)]
pub struct MessageClassifier {
    seen: HashSet<String>,
}

impl MessageClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(&mut self, message: &AgentMessage) -> Vec<AgentEvent> {
        if !self.seen.insert(message.id().to_string()) {
            return Vec::new();
        }

        match message {
            AgentMessage::Human { .. } => Vec::new(),
            AgentMessage::Ai { content, .. } => {
                let mut events = Vec::new();
                for block in content {
                    if let ContentBlock::Text { text } = block
                        && !text.trim().is_empty()
                    {
                        events.push(AgentEvent::Message {
                            content: text.clone(),
                        });
                    }
                }
                // Tool calls follow the text of the same message.
                for block in content {
                    if let ContentBlock::ToolUse { id, name, input } = block {
                        events.push(AgentEvent::ToolCall {
                            tool_call_id: id.clone(),
                            tool_call_name: name.clone(),
                            tool_call_args: input.clone(),
                        });
                    }
                }
                events
            }
            AgentMessage::Tool {
                tool_call_id,
                name,
                content,
                ..
            } => match serde_json::from_str::<Value>(content) {
                Ok(result) => vec![AgentEvent::ToolCallResult {
                    tool_call_id: tool_call_id.clone(),
                    tool_call_name: name.clone(),
                    tool_call_result: result,
                }],
                Err(e) => {
                    tracing::debug!("Skipping non-JSON result of tool call {}: {}", tool_call_id, e);
                    Vec::new()
                }
            },
        }
    }
}
