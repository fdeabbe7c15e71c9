//! A2A Protocol data types.
//!
//! Reference: <https://a2a-protocol.org/latest/specification/>
//! JSON-RPC binding, camelCase wire names, `kind` discriminators.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

pub type Metadata = HashMap<String, Value>;

// ─── Task Lifecycle ──────────────────────────────────────────

/// Task states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    Completed,
    Canceled,
    Failed,
    Rejected,
    AuthRequired,
    Unknown,
}

impl TaskState {
    /// No further events will be produced for the task.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Canceled | Self::Failed | Self::Rejected
        )
    }
}

/// Current status of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl TaskStatus {
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            message: None,
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.message = Some(message);
        self
    }
}

/// Task, the unit of work tracked by the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default = "task_kind")]
    pub kind: String, // "task"
    pub id: String,
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

fn task_kind() -> String {
    "task".to_string()
}

impl Task {
    /// Copy with history limited to the last `length` messages.
    pub fn with_history_length(mut self, length: Option<usize>) -> Self {
        if let Some(length) = length
            && self.history.len() > length
        {
            self.history = self.history.split_off(self.history.len() - length);
        }
        self
    }
}

// ─── Message & Part ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// File content, inline (`bytes`, base64) or by reference (`uri`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Content container of messages and artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Metadata>,
    },
    Data {
        data: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Metadata>,
    },
    File {
        file: FileContent,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Metadata>,
    },
}

impl Part {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text {
            text: s.into(),
            metadata: None,
        }
    }

    pub fn data(data: Value) -> Self {
        Self::Data {
            data,
            metadata: None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// One turn of communication between user and agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default = "message_kind")]
    pub kind: String, // "message"
    pub message_id: String,
    pub role: Role,
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_task_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

fn message_kind() -> String {
    "message".to_string()
}

impl Message {
    /// Text parts joined with newlines.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ─── Artifact ────────────────────────────────────────────────

/// Output produced by a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub artifact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

// ─── Agent Card (Discovery) ─────────────────────────────────

/// Agent Card, published at `.well-known/agent.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<AgentProvider>,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
    pub protocol_version: String,
    pub preferred_transport: String,
    pub capabilities: AgentCapabilities,
    pub default_input_modes: Vec<String>,
    pub default_output_modes: Vec<String>,
    pub skills: Vec<AgentSkill>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProvider {
    pub organization: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub push_notifications: bool,
    #[serde(default)]
    pub state_transition_history: bool,
}

/// A capability the agent offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_modes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_modes: Vec<String>,
}

// ─── JSON-RPC 2.0 ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
            id,
        }
    }

    /// Success response carrying any serializable result.
    pub fn from_result<T: Serialize>(id: Value, result: &T) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => Self::success(id, value),
            Err(e) => Self::error(
                id,
                error_codes::INTERNAL_ERROR,
                format!("Failed to serialize result: {}", e),
            ),
        }
    }
}

// ─── Streaming Events ────────────────────────────────────────

/// Status change of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdateEvent {
    #[serde(default = "status_update_kind")]
    pub kind: String, // "status-update"
    pub task_id: String,
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(rename = "final")]
    pub is_final: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

fn status_update_kind() -> String {
    "status-update".to_string()
}

impl TaskStatusUpdateEvent {
    pub fn new(task: &Task, status: TaskStatus, is_final: bool) -> Self {
        Self {
            kind: status_update_kind(),
            task_id: task.id.clone(),
            context_id: task.context_id.clone(),
            status,
            is_final,
            metadata: None,
        }
    }
}

/// New or extended artifact of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskArtifactUpdateEvent {
    #[serde(default = "artifact_update_kind")]
    pub kind: String, // "artifact-update"
    pub task_id: String,
    pub context_id: String,
    pub artifact: Artifact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_chunk: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

fn artifact_update_kind() -> String {
    "artifact-update".to_string()
}

impl TaskArtifactUpdateEvent {
    pub fn new(task: &Task, artifact: Artifact) -> Self {
        Self {
            kind: artifact_update_kind(),
            task_id: task.id.clone(),
            context_id: task.context_id.clone(),
            artifact,
            append: None,
            last_chunk: None,
            metadata: None,
        }
    }
}

/// Anything an executor can put on the event queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StreamEvent {
    Task(Task),
    Message(Message),
    StatusUpdate(TaskStatusUpdateEvent),
    ArtifactUpdate(TaskArtifactUpdateEvent),
}

impl StreamEvent {
    /// Ends the response: a direct message, a final status update, or a
    /// task snapshot that is already terminal or waiting for input.
    pub fn is_final(&self) -> bool {
        match self {
            Self::Message(_) => true,
            Self::StatusUpdate(e) => e.is_final,
            Self::Task(t) => t.status.state.is_terminal() || t.status.state == TaskState::InputRequired,
            Self::ArtifactUpdate(_) => false,
        }
    }
}

impl From<Task> for StreamEvent {
    fn from(task: Task) -> Self {
        Self::Task(task)
    }
}

impl From<Message> for StreamEvent {
    fn from(message: Message) -> Self {
        Self::Message(message)
    }
}

impl From<TaskStatusUpdateEvent> for StreamEvent {
    fn from(event: TaskStatusUpdateEvent) -> Self {
        Self::StatusUpdate(event)
    }
}

impl From<TaskArtifactUpdateEvent> for StreamEvent {
    fn from(event: TaskArtifactUpdateEvent) -> Self {
        Self::ArtifactUpdate(event)
    }
}

// ─── Request Parameters ──────────────────────────────────────

/// Client preferences for `message/send` and `message/stream`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSendConfiguration {
    #[serde(default)]
    pub accepted_output_modes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocking: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageParams {
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<MessageSendConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl SendMessageParams {
    /// `configuration.blocking`, defaulting to true.
    pub fn blocking(&self) -> bool {
        self.configuration
            .as_ref()
            .and_then(|c| c.blocking)
            .unwrap_or(true)
    }

    pub fn history_length(&self) -> Option<usize> {
        self.configuration.as_ref().and_then(|c| c.history_length)
    }
}

/// `tasks/get` params.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQueryParams {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_length: Option<usize>,
}

/// `tasks/cancel` params.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskIdParams {
    pub id: String,
}

// ─── A2A Error Codes ─────────────────────────────────────────

pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const TASK_NOT_FOUND: i64 = -32001;
    pub const TASK_NOT_CANCELABLE: i64 = -32002;
    pub const PUSH_NOTIFICATION_NOT_SUPPORTED: i64 = -32003;
    pub const UNSUPPORTED_OPERATION: i64 = -32004;
    pub const CONTENT_TYPE_NOT_SUPPORTED: i64 = -32005;
}

// ─── Constructors ────────────────────────────────────────────

/// Submitted task for an incoming user message.
///
/// Ids come from the message when present, otherwise fresh UUIDs.
pub fn new_task(request: &Message) -> Task {
    Task {
        kind: task_kind(),
        id: request
            .task_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        context_id: request
            .context_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        status: TaskStatus::new(TaskState::Submitted),
        artifacts: Vec::new(),
        history: vec![request.clone()],
        metadata: None,
    }
}

fn agent_message(parts: Vec<Part>, context_id: &str, task_id: &str) -> Message {
    Message {
        kind: message_kind(),
        message_id: Uuid::new_v4().to_string(),
        role: Role::Agent,
        parts,
        context_id: Some(context_id.to_string()),
        task_id: Some(task_id.to_string()),
        reference_task_ids: Vec::new(),
        metadata: None,
    }
}

pub fn new_agent_text_message(text: impl Into<String>, context_id: &str, task_id: &str) -> Message {
    agent_message(vec![Part::text(text)], context_id, task_id)
}

pub fn new_agent_data_message(data: Value, context_id: &str, task_id: &str) -> Message {
    agent_message(vec![Part::data(data)], context_id, task_id)
}

pub fn new_text_artifact(
    name: impl Into<String>,
    description: impl Into<String>,
    text: impl Into<String>,
) -> Artifact {
    Artifact {
        artifact_id: Uuid::new_v4().to_string(),
        name: Some(name.into()),
        description: Some(description.into()),
        parts: vec![Part::text(text)],
        metadata: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_message(text: &str) -> Message {
        serde_json::from_value(serde_json::json!({
            "kind": "message",
            "messageId": "msg-1",
            "role": "user",
            "parts": [{"kind": "text", "text": text}]
        }))
        .expect("message")
    }

    #[test]
    fn test_task_state_wire_values() {
        assert_eq!(
            serde_json::to_string(&TaskState::InputRequired).unwrap(),
            "\"input-required\""
        );
        assert_eq!(
            serde_json::to_string(&TaskState::AuthRequired).unwrap(),
            "\"auth-required\""
        );
        assert!(TaskState::Completed.is_terminal());
        assert!(!TaskState::InputRequired.is_terminal());
    }

    #[test]
    fn test_parts_are_kind_tagged() {
        let parts: Vec<Part> = serde_json::from_value(serde_json::json!([
            {"kind": "text", "text": "hi"},
            {"kind": "data", "data": {"a": 1}},
            {"kind": "file", "file": {"uri": "https://example.com/a.pdf", "mimeType": "application/pdf"}}
        ]))
        .unwrap();
        assert_eq!(parts[0].as_text(), Some("hi"));
        assert!(matches!(&parts[1], Part::Data { data, .. } if data["a"] == 1));
        assert!(matches!(&parts[2], Part::File { file, .. } if file.mime_type.as_deref() == Some("application/pdf")));
    }

    #[test]
    fn test_new_task_uses_message_ids() {
        let mut message = user_message("Who is Leo Messi?");
        message.context_id = Some("ctx-1".to_string());
        message.task_id = Some("task-1".to_string());

        let task = new_task(&message);
        assert_eq!(task.id, "task-1");
        assert_eq!(task.context_id, "ctx-1");
        assert_eq!(task.status.state, TaskState::Submitted);
        assert_eq!(task.history.len(), 1);

        let fresh = new_task(&user_message("hi"));
        assert!(Uuid::parse_str(&fresh.id).is_ok());
        assert!(Uuid::parse_str(&fresh.context_id).is_ok());
    }

    #[test]
    fn test_status_update_wire_shape() {
        let task = new_task(&user_message("hi"));
        let event = TaskStatusUpdateEvent::new(
            &task,
            TaskStatus::new(TaskState::Working).with_message(new_agent_text_message(
                "Searching",
                &task.context_id,
                &task.id,
            )),
            false,
        );
        let json = serde_json::to_value(StreamEvent::from(event)).unwrap();
        assert_eq!(json["kind"], "status-update");
        assert_eq!(json["final"], false);
        assert_eq!(json["status"]["state"], "working");
        assert_eq!(json["status"]["message"]["kind"], "message");
        assert_eq!(json["status"]["message"]["role"], "agent");
        assert_eq!(json["status"]["message"]["parts"][0]["kind"], "text");
        assert_eq!(json["taskId"], task.id.as_str());
    }

    #[test]
    fn test_text_artifact() {
        let artifact = new_text_artifact("Tavily Search Result", "Leo Messi", "A footballer.");
        let json = serde_json::to_value(&artifact).unwrap();
        assert_eq!(json["name"], "Tavily Search Result");
        assert_eq!(json["description"], "Leo Messi");
        assert_eq!(json["parts"][0]["text"], "A footballer.");
        assert!(json["artifactId"].is_string());
    }

    #[test]
    fn test_history_length_keeps_latest() {
        let mut task = new_task(&user_message("one"));
        task.history.push(user_message("two"));
        task.history.push(user_message("three"));

        let trimmed = task.clone().with_history_length(Some(2));
        assert_eq!(trimmed.history.len(), 2);
        assert_eq!(trimmed.history[1].text(), "three");
        assert_eq!(task.with_history_length(None).history.len(), 3);
    }

    #[test]
    fn test_blocking_defaults_to_true() {
        let params: SendMessageParams = serde_json::from_value(serde_json::json!({
            "message": {"messageId": "m", "role": "user", "parts": []}
        }))
        .unwrap();
        assert!(params.blocking());

        let params: SendMessageParams = serde_json::from_value(serde_json::json!({
            "message": {"messageId": "m", "role": "user", "parts": []},
            "configuration": {"blocking": false, "acceptedOutputModes": ["text"]}
        }))
        .unwrap();
        assert!(!params.blocking());
    }

    #[test]
    fn test_json_rpc_error_response() {
        let resp = JsonRpcResponse::error(
            serde_json::json!(1),
            error_codes::METHOD_NOT_FOUND,
            "Method not found",
        );
        assert_eq!(resp.error.as_ref().expect("has error").code, -32601);
        assert!(resp.result.is_none());
    }
}
