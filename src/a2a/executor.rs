//! Agent executors: turn one A2A request into queued task events.

use super::error::{A2aError, Result};
use super::events::EventQueue;
use super::types::*;
use crate::brain::agent::{AgentEvent, AgentResponse, SearchAgent};
use async_trait::async_trait;
use futures::StreamExt;

pub const ARTIFACT_NAME: &str = "Tavily Search Result";

/// Everything an executor knows about the request it serves.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub message: Option<Message>,
    pub current_task: Option<Task>,
    pub task_id: String,
    pub context_id: String,
}

impl RequestContext {
    /// Text parts of the incoming message, newline-joined.
    pub fn get_user_input(&self) -> String {
        self.message.as_ref().map(Message::text).unwrap_or_default()
    }
}

#[async_trait]
pub trait AgentExecutor: Send + Sync {
    async fn execute(&self, context: RequestContext, queue: EventQueue) -> Result<()>;

    async fn cancel(&self, context: RequestContext, queue: EventQueue) -> Result<()>;
}

/// Relays a [`SearchAgent`] run as task events.
pub struct SearchAgentExecutor {
    agent: SearchAgent,
    forward_tool_calls: bool,
}

impl SearchAgentExecutor {
    pub fn new(agent: SearchAgent) -> Self {
        Self {
            agent,
            forward_tool_calls: true,
        }
    }

    pub fn with_forward_tool_calls(mut self, forward: bool) -> Self {
        self.forward_tool_calls = forward;
        self
    }

    async fn relay_response(
        &self,
        task: &Task,
        response: AgentResponse,
        queue: &EventQueue,
    ) -> Result<()> {
        if response.is_task_complete && !response.require_user_input {
            let artifact = new_text_artifact(
                ARTIFACT_NAME,
                response.task_description.unwrap_or_default(),
                response.task_output.unwrap_or_default(),
            );
            queue
                .enqueue_event(TaskArtifactUpdateEvent::new(task, artifact))
                .await?;
            queue
                .enqueue_event(TaskStatusUpdateEvent::new(
                    task,
                    TaskStatus::new(TaskState::Completed),
                    true,
                ))
                .await
        } else {
            queue
                .enqueue_event(TaskStatusUpdateEvent::new(
                    task,
                    TaskStatus::new(TaskState::InputRequired),
                    true,
                ))
                .await
        }
    }
}

#[async_trait]
impl AgentExecutor for SearchAgentExecutor {
    async fn execute(&self, context: RequestContext, queue: EventQueue) -> Result<()> {
        let query = context.get_user_input();
        let Some(message) = context.message.as_ref() else {
            return Err(A2aError::InvalidParams("No message in context".to_string()));
        };

        let task = match context.current_task {
            Some(task) => task,
            None => {
                let task = new_task(message);
                queue.enqueue_event(task.clone()).await?;
                task
            }
        };

        tracing::info!("Task {} (context {}): {}", task.id, task.context_id, query);
        let mut events = self.agent.stream(query, task.context_id.clone());

        while let Some(event) = events.next().await {
            match event {
                Ok(AgentEvent::Message { content }) => {
                    let status = TaskStatus::new(TaskState::Working).with_message(
                        new_agent_text_message(content, &task.context_id, &task.id),
                    );
                    queue
                        .enqueue_event(TaskStatusUpdateEvent::new(&task, status, false))
                        .await?;
                }
                Ok(event @ (AgentEvent::ToolCall { .. } | AgentEvent::ToolCallResult { .. })) => {
                    if !self.forward_tool_calls {
                        tracing::debug!("Not forwarding tool event for task {}", task.id);
                        continue;
                    }
                    let data = serde_json::to_value(&event)
                        .map_err(|e| A2aError::Internal(e.to_string()))?;
                    let status = TaskStatus::new(TaskState::Working).with_message(
                        new_agent_data_message(data, &task.context_id, &task.id),
                    );
                    queue
                        .enqueue_event(TaskStatusUpdateEvent::new(&task, status, false))
                        .await?;
                }
                Ok(AgentEvent::Response(response)) => {
                    return self.relay_response(&task, response, &queue).await;
                }
                Err(e) => {
                    tracing::error!("Agent failed on task {}: {}", task.id, e);
                    let status = TaskStatus::new(TaskState::Failed).with_message(
                        new_agent_text_message(e.to_string(), &task.context_id, &task.id),
                    );
                    return queue
                        .enqueue_event(TaskStatusUpdateEvent::new(&task, status, true))
                        .await;
                }
            }
        }

        Err(A2aError::Internal(
            "Agent stream ended without a response".to_string(),
        ))
    }

    async fn cancel(&self, _context: RequestContext, _queue: EventQueue) -> Result<()> {
        Err(A2aError::UnsupportedOperation(
            "Cancel not supported".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::agent::test_helpers::{ScriptedProvider, search_agent, structured, text, tool_use};
    use tokio::sync::mpsc;

    fn context_for(text: &str) -> RequestContext {
        let message: Message = serde_json::from_value(serde_json::json!({
            "messageId": "m-1",
            "role": "user",
            "contextId": "ctx-1",
            "taskId": "task-1",
            "parts": [{"kind": "text", "text": text}]
        }))
        .unwrap();
        RequestContext {
            message: Some(message),
            current_task: None,
            task_id: "task-1".to_string(),
            context_id: "ctx-1".to_string(),
        }
    }

    async fn drain(mut rx: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_complete_run_emits_artifact_then_completed() {
        let provider = ScriptedProvider::new(vec![
            vec![
                text("Searching the web."),
                tool_use("call_1", "tavily_search", serde_json::json!({"query": "Leo Messi"})),
            ],
            vec![text("Leo Messi is an Argentine footballer.")],
            structured("completed", "Leo Messi", "An Argentine footballer."),
        ]);
        let executor = SearchAgentExecutor::new(search_agent(provider));
        let (queue, rx) = EventQueue::new(32);

        executor
            .execute(context_for("Who is Leo Messi?"), queue)
            .await
            .expect("execute");
        let events = drain(rx).await;

        assert!(matches!(&events[0], StreamEvent::Task(t) if t.id == "task-1" && t.context_id == "ctx-1"));
        assert!(matches!(&events[1], StreamEvent::StatusUpdate(e)
            if e.status.state == TaskState::Working && !e.is_final
            && e.status.message.as_ref().unwrap().text() == "Searching the web."));
        // tool call and tool result travel as data parts
        let data: Vec<&serde_json::Value> = events[2..4]
            .iter()
            .map(|event| {
                let StreamEvent::StatusUpdate(update) = event else {
                    panic!("expected status update, got {:?}", event);
                };
                assert_eq!(update.status.state, TaskState::Working);
                assert!(!update.is_final);
                match &update.status.message.as_ref().unwrap().parts[0] {
                    Part::Data { data, .. } => data,
                    other => panic!("expected data part, got {:?}", other),
                }
            })
            .collect();

        assert_eq!(data[0]["type"], "tool_call");
        assert_eq!(data[0]["tool_call_id"], "call_1");
        assert_eq!(data[0]["tool_call_name"], "tavily_search");
        assert_eq!(data[0]["tool_call_args"], serde_json::json!({"query": "Leo Messi"}));

        assert_eq!(data[1]["type"], "tool_call_result");
        assert_eq!(data[1]["tool_call_id"], "call_1");
        assert_eq!(data[1]["tool_call_name"], "tavily_search");
        assert_eq!(data[1]["tool_call_result"]["query"], "Leo Messi");
        assert_eq!(data[1]["tool_call_result"]["results"][0]["title"], "Lionel Messi");
        let StreamEvent::ArtifactUpdate(artifact) = &events[5] else {
            panic!("expected artifact update, got {:?}", events[5]);
        };
        assert_eq!(artifact.artifact.name.as_deref(), Some(ARTIFACT_NAME));
        assert_eq!(artifact.artifact.description.as_deref(), Some("Leo Messi"));
        assert_eq!(artifact.artifact.parts[0].as_text(), Some("An Argentine footballer."));
        assert!(matches!(&events[6], StreamEvent::StatusUpdate(e)
            if e.status.state == TaskState::Completed && e.is_final));
        assert_eq!(events.len(), 7);
    }

    #[tokio::test]
    async fn test_tool_events_can_be_suppressed() {
        let provider = ScriptedProvider::new(vec![
            vec![tool_use("call_1", "tavily_search", serde_json::json!({"query": "x"}))],
            vec![text("Please be more specific.")],
            structured("input_required", "", ""),
        ]);
        let executor = SearchAgentExecutor::new(search_agent(provider)).with_forward_tool_calls(false);
        let (queue, rx) = EventQueue::new(32);

        executor.execute(context_for("x"), queue).await.expect("execute");
        let events = drain(rx).await;

        assert_eq!(events.len(), 3);
        assert!(matches!(events.last(), Some(StreamEvent::StatusUpdate(e))
            if e.status.state == TaskState::InputRequired && e.is_final && e.status.message.is_none()));
    }

    #[tokio::test]
    async fn test_existing_task_is_not_re_enqueued() {
        let provider = ScriptedProvider::new(vec![
            vec![text("Done.")],
            structured("error", "", ""),
        ]);
        let executor = SearchAgentExecutor::new(search_agent(provider));
        let mut context = context_for("again");
        context.current_task = Some(new_task(context.message.as_ref().unwrap()));
        let (queue, rx) = EventQueue::new(32);

        executor.execute(context, queue).await.expect("execute");
        let events = drain(rx).await;
        assert!(!events.iter().any(|e| matches!(e, StreamEvent::Task(_))));
        assert!(matches!(events.last(), Some(StreamEvent::StatusUpdate(e))
            if e.status.state == TaskState::InputRequired));
    }

    #[tokio::test]
    async fn test_agent_error_fails_task() {
        let executor = SearchAgentExecutor::new(search_agent(ScriptedProvider::new(vec![])));
        let (queue, rx) = EventQueue::new(32);

        executor.execute(context_for("q"), queue).await.expect("execute");
        let events = drain(rx).await;
        assert!(matches!(events.last(), Some(StreamEvent::StatusUpdate(e))
            if e.status.state == TaskState::Failed && e.is_final));
    }

    #[tokio::test]
    async fn test_missing_message_is_rejected() {
        let executor = SearchAgentExecutor::new(search_agent(ScriptedProvider::new(vec![])));
        let mut context = context_for("q");
        context.message = None;
        let (queue, _rx) = EventQueue::new(4);

        let err = executor.execute(context, queue).await.expect_err("no message");
        assert!(matches!(err, A2aError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_cancel_not_supported() {
        let executor = SearchAgentExecutor::new(search_agent(ScriptedProvider::new(vec![])));
        let (queue, _rx) = EventQueue::new(4);
        let err = executor
            .cancel(context_for("q"), queue)
            .await
            .expect_err("unsupported");
        assert_eq!(err.to_string(), "Cancel not supported");
    }
}
