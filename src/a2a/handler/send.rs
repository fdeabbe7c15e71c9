//! Handler for `message/send`.

use super::{AppliedEvent, prepare_request, run_executor};
use crate::a2a::error::A2aError;
use crate::a2a::events::TaskStore;
use crate::a2a::executor::AgentExecutor;
use crate::a2a::types::*;
use std::sync::Arc;

/// Handle `message/send`.
///
/// Blocking requests (the default) wait for the final event and return the
/// task as it stands then. Non-blocking requests return after the first
/// event while the run continues in the background.
pub async fn handle_send_message(
    id: serde_json::Value,
    params: serde_json::Value,
    store: TaskStore,
    executor: Arc<dyn AgentExecutor>,
) -> JsonRpcResponse {
    let (params, context) = match prepare_request(params, &store).await {
        Ok(prepared) => prepared,
        Err(e) => return e.to_response(id),
    };

    let task_id = context.task_id.clone();
    let blocking = params.blocking();
    tracing::info!("A2A: message/send for task {} (blocking={})", task_id, blocking);

    let mut rx = run_executor(executor, context, store.clone());
    let mut snapshot = None;
    while let Some(item) = rx.recv().await {
        match item {
            Ok(AppliedEvent {
                event: StreamEvent::Message(message),
                ..
            }) => {
                return JsonRpcResponse::from_result(id, &message);
            }
            Ok(AppliedEvent { event, task }) => {
                let finished = event.is_final();
                snapshot = task.or(snapshot);
                if !blocking || finished {
                    break;
                }
            }
            Err(e) => return e.to_response(id),
        }
    }

    // Non-blocking replies carry the task as of the first event, not as it
    // stands now while the run continues.
    let task = match snapshot {
        Some(task) => Some(task),
        None => store.read().await.get(&task_id).cloned(),
    };
    match task {
        Some(task) => JsonRpcResponse::from_result(id, &task.with_history_length(params.history_length())),
        None => A2aError::Internal(format!("No task was produced for {}", task_id)).to_response(id),
    }
}
