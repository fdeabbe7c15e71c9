//! JSON-RPC 2.0 handler for A2A protocol operations.
//!
//! Dispatches JSON-RPC methods:
//! - `message/send`   → run the executor, reply with the task
//! - `message/stream` → run the executor, reply with an SSE event stream
//! - `tasks/get`      → retrieve task by ID
//! - `tasks/cancel`   → ask the executor to cancel a task

mod send;
pub mod stream;
mod tasks;

use crate::a2a::agent_card::OUTPUT_MODES;
use crate::a2a::error::{A2aError, Result};
use crate::a2a::events::{EventQueue, ResultAggregator, TaskStore};
use crate::a2a::executor::{AgentExecutor, RequestContext};
use crate::a2a::types::*;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

pub use crate::a2a::events::new_task_store;

/// One executor event together with the task as it stood right after the
/// event was applied. `task` is `None` for direct messages.
#[derive(Debug, Clone)]
pub struct AppliedEvent {
    pub event: StreamEvent,
    pub task: Option<Task>,
}

/// Events of one execution, after they were applied to the task store.
/// An executor failure arrives as the last item.
pub type ExecutionRx = mpsc::Receiver<Result<AppliedEvent>>;

/// Dispatch a JSON-RPC request to the appropriate handler.
pub async fn dispatch(
    req: JsonRpcRequest,
    store: TaskStore,
    executor: Arc<dyn AgentExecutor>,
) -> JsonRpcResponse {
    match req.method.as_str() {
        "message/send" => send::handle_send_message(req.id, req.params, store, executor).await,
        "tasks/get" => tasks::handle_get_task(req.id, req.params, store).await,
        "tasks/cancel" => tasks::handle_cancel_task(req.id, req.params, store, executor).await,
        "message/stream" => JsonRpcResponse::error(
            req.id,
            error_codes::INVALID_REQUEST,
            "message/stream must be requested over the streaming endpoint",
        ),
        _ => JsonRpcResponse::error(
            req.id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", req.method),
        ),
    }
}

/// Validate `message/send` params and resolve the task they address.
///
/// A `taskId` on the message continues that task in its original context;
/// otherwise fresh ids are assigned. The message is stamped with both ids.
pub(super) async fn prepare_request(
    params: serde_json::Value,
    store: &TaskStore,
) -> Result<(SendMessageParams, RequestContext)> {
    let mut params: SendMessageParams =
        serde_json::from_value(params).map_err(|e| A2aError::InvalidParams(e.to_string()))?;

    if params.message.text().trim().is_empty() {
        return Err(A2aError::InvalidParams(
            "Message must contain at least one text part".to_string(),
        ));
    }

    if let Some(config) = &params.configuration
        && !modes_compatible(&config.accepted_output_modes)
    {
        return Err(A2aError::ContentTypeNotSupported(format!(
            "agent produces {:?}, client accepts {:?}",
            OUTPUT_MODES, config.accepted_output_modes
        )));
    }

    let current_task = match params.message.task_id.as_deref() {
        Some(task_id) => {
            let mut tasks = store.write().await;
            let task = tasks
                .get_mut(task_id)
                .ok_or_else(|| A2aError::TaskNotFound(task_id.to_string()))?;
            if task.status.state.is_terminal() {
                return Err(A2aError::InvalidParams(format!(
                    "Task {} is in terminal state: {:?}",
                    task.id, task.status.state
                )));
            }
            params.message.context_id = Some(task.context_id.clone());
            task.history.push(params.message.clone());
            Some(task.clone())
        }
        None => None,
    };

    let task_id = params
        .message
        .task_id
        .get_or_insert_with(|| Uuid::new_v4().to_string())
        .clone();
    let context_id = params
        .message
        .context_id
        .get_or_insert_with(|| Uuid::new_v4().to_string())
        .clone();

    let context = RequestContext {
        message: Some(params.message.clone()),
        current_task,
        task_id,
        context_id,
    };
    Ok((params, context))
}

fn modes_compatible(accepted: &[String]) -> bool {
    accepted.is_empty() || accepted.iter().any(|m| OUTPUT_MODES.contains(&m.as_str()))
}

/// Run the executor in the background and fold its events into the store.
///
/// Aggregation continues after the receiver is dropped so the stored task
/// always reflects the full run.
pub(super) fn run_executor(
    executor: Arc<dyn AgentExecutor>,
    context: RequestContext,
    store: TaskStore,
) -> ExecutionRx {
    let (queue, mut events) = EventQueue::new(32);
    let (tx, rx) = mpsc::channel(32);
    let aggregator = ResultAggregator::new(store);
    let task_id = context.task_id.clone();

    let execution = tokio::spawn(async move { executor.execute(context, queue).await });

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let task = aggregator.apply(&event).await;
            let _ = tx.send(Ok(AppliedEvent { event, task })).await;
        }
        let outcome = match execution.await {
            Ok(result) => result,
            Err(e) => Err(A2aError::Internal(format!("Executor panicked: {}", e))),
        };
        if let Err(e) = outcome {
            tracing::error!("A2A: Execution of task {} failed: {}", task_id, e);
            let _ = tx.send(Err(e)).await;
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::executor::SearchAgentExecutor;
    use crate::brain::agent::test_helpers::{ScriptedProvider, search_agent, structured, text};

    fn executor_with(responses: Vec<Vec<crate::brain::provider::ContentBlock>>) -> Arc<dyn AgentExecutor> {
        Arc::new(SearchAgentExecutor::new(search_agent(ScriptedProvider::new(responses))))
    }

    fn rpc(method: &str, params: serde_json::Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: serde_json::json!(1),
        }
    }

    fn send_params(text: &str) -> serde_json::Value {
        serde_json::json!({
            "message": {
                "kind": "message",
                "messageId": "m-1",
                "role": "user",
                "parts": [{"kind": "text", "text": text}]
            }
        })
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let resp = dispatch(rpc("unknown/method", serde_json::json!({})), new_task_store(), executor_with(vec![])).await;
        assert_eq!(resp.error.as_ref().expect("err").code, -32601);
    }

    #[tokio::test]
    async fn test_prepare_assigns_ids() {
        let store = new_task_store();
        let (params, context) = prepare_request(send_params("hi"), &store).await.expect("prepare");
        assert!(context.current_task.is_none());
        assert_eq!(params.message.task_id.as_deref(), Some(context.task_id.as_str()));
        assert_eq!(params.message.context_id.as_deref(), Some(context.context_id.as_str()));
    }

    #[tokio::test]
    async fn test_prepare_rejects_bad_input() {
        let store = new_task_store();

        let err = prepare_request(serde_json::json!({"message": 5}), &store).await.expect_err("bad");
        assert_eq!(err.code(), error_codes::INVALID_PARAMS);

        let err = prepare_request(send_params("   "), &store).await.expect_err("empty");
        assert_eq!(err.code(), error_codes::INVALID_PARAMS);

        let mut params = send_params("hi");
        params["configuration"] = serde_json::json!({"acceptedOutputModes": ["image/png"]});
        let err = prepare_request(params, &store).await.expect_err("modes");
        assert_eq!(err.code(), error_codes::CONTENT_TYPE_NOT_SUPPORTED);

        let mut params = send_params("hi");
        params["message"]["taskId"] = serde_json::json!("missing");
        let err = prepare_request(params, &store).await.expect_err("unknown task");
        assert_eq!(err.code(), error_codes::TASK_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_continuation_keeps_context() {
        let store = new_task_store();
        let mut task = new_task(&serde_json::from_value(send_params("first")["message"].clone()).unwrap());
        task.status = TaskStatus::new(TaskState::InputRequired);
        store.write().await.insert(task.id.clone(), task.clone());

        let mut params = send_params("more detail");
        params["message"]["taskId"] = serde_json::json!(task.id);
        params["message"]["contextId"] = serde_json::json!("some-other-context");
        let (_, context) = prepare_request(params, &store).await.expect("prepare");

        assert_eq!(context.task_id, task.id);
        assert_eq!(context.context_id, task.context_id);
        assert_eq!(context.current_task.expect("task").history.len(), 2);

        store.write().await.get_mut(&task.id).unwrap().status = TaskStatus::new(TaskState::Completed);
        let mut params = send_params("again");
        params["message"]["taskId"] = serde_json::json!(task.id);
        let err = prepare_request(params, &store).await.expect_err("terminal");
        assert_eq!(err.code(), error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_run_executor_updates_store() {
        let store = new_task_store();
        let executor = executor_with(vec![vec![text("Hello.")], structured("completed", "hi", "Hello.")]);
        let (_, context) = prepare_request(send_params("hi"), &store).await.unwrap();
        let task_id = context.task_id.clone();

        let mut rx = run_executor(executor, context, store.clone());
        let mut states = Vec::new();
        while let Some(item) = rx.recv().await {
            let applied = item.expect("event");
            states.push(applied.task.expect("snapshot").status.state);
        }
        // task, working, artifact, completed; each snapshot is taken at its own event
        assert_eq!(
            states,
            vec![
                TaskState::Submitted,
                TaskState::Working,
                TaskState::Working,
                TaskState::Completed
            ]
        );
        let task = store.read().await[&task_id].clone();
        assert_eq!(task.status.state, TaskState::Completed);
        assert_eq!(task.artifacts.len(), 1);
    }
}
