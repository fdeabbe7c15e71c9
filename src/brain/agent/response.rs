//! Structured response record and the completion decision derived from it.

use crate::brain::provider::Tool;
use serde::{Deserialize, Serialize};

use super::prompts::STRUCTURED_RESPONSE_TOOL;

/// Status the model reports at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuredStatus {
    Completed,
    #[default]
    InputRequired,
    Error,
}

/// Respond to the user in this format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredResponse {
    pub status: StructuredStatus,
    pub task_description: String,
    pub task_output: String,
}

impl StructuredResponse {
    /// Tool definition whose input schema is this record.
    pub fn tool_definition() -> Tool {
        Tool {
            name: STRUCTURED_RESPONSE_TOOL.to_string(),
            description: "Respond to the user in this format.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "status": {
                        "type": "string",
                        "enum": ["completed", "input_required", "error"],
                        "default": "input_required"
                    },
                    "task_description": {"type": "string", "default": ""},
                    "task_output": {"type": "string", "default": ""}
                }
            }),
        }
    }
}

/// Final outcome of an agent run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub is_task_complete: bool,
    pub require_user_input: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_output: Option<String>,
}

impl AgentResponse {
    pub fn input_required() -> Self {
        Self {
            is_task_complete: false,
            require_user_input: true,
            task_description: None,
            task_output: None,
        }
    }

    pub fn completed(task_description: String, task_output: String) -> Self {
        Self {
            is_task_complete: true,
            require_user_input: false,
            task_description: Some(task_description),
            task_output: Some(task_output),
        }
    }
}

/// Map the thread's structured response to a completion decision.
///
/// `error` is reported as input-required so the user can retry with a better query.
pub fn get_agent_response(structured: Option<&StructuredResponse>) -> AgentResponse {
    match structured {
        Some(r) if r.status == StructuredStatus::Completed => {
            AgentResponse::completed(r.task_description.clone(), r.task_output.clone())
        }
        _ => AgentResponse::input_required(),
    }
}
