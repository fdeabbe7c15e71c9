//! Handlers for `tasks/get` and `tasks/cancel`.

use crate::a2a::error::A2aError;
use crate::a2a::events::{EventQueue, ResultAggregator, TaskStore};
use crate::a2a::executor::{AgentExecutor, RequestContext};
use crate::a2a::types::*;
use std::sync::Arc;

/// Handle `tasks/get`.
pub async fn handle_get_task(
    id: serde_json::Value,
    params: serde_json::Value,
    store: TaskStore,
) -> JsonRpcResponse {
    let query: TaskQueryParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => return A2aError::InvalidParams(e.to_string()).to_response(id),
    };

    let task = store.read().await.get(&query.id).cloned();
    match task {
        Some(task) => JsonRpcResponse::from_result(id, &task.with_history_length(query.history_length)),
        None => A2aError::TaskNotFound(query.id).to_response(id),
    }
}

/// Handle `tasks/cancel`: terminal tasks cannot be canceled, anything else
/// is up to the executor.
pub async fn handle_cancel_task(
    id: serde_json::Value,
    params: serde_json::Value,
    store: TaskStore,
    executor: Arc<dyn AgentExecutor>,
) -> JsonRpcResponse {
    let cancel: TaskIdParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => return A2aError::InvalidParams(e.to_string()).to_response(id),
    };

    let Some(task) = store.read().await.get(&cancel.id).cloned() else {
        return A2aError::TaskNotFound(cancel.id).to_response(id);
    };
    if task.status.state.is_terminal() {
        return A2aError::TaskNotCancelable(format!(
            "task {} is already {:?}",
            task.id, task.status.state
        ))
        .to_response(id);
    }

    let context = RequestContext {
        message: None,
        task_id: task.id.clone(),
        context_id: task.context_id.clone(),
        current_task: Some(task.clone()),
    };
    let (queue, mut events) = EventQueue::new(32);
    if let Err(e) = executor.cancel(context, queue).await {
        tracing::info!("A2A: Cancel of task {} refused: {}", task.id, e);
        return e.to_response(id);
    }

    let aggregator = ResultAggregator::new(store.clone());
    while let Some(event) = events.recv().await {
        aggregator.apply(&event).await;
    }

    let mut tasks = store.write().await;
    match tasks.get_mut(&task.id) {
        Some(stored) => {
            if !stored.status.state.is_terminal() {
                stored.status = TaskStatus::new(TaskState::Canceled);
            }
            tracing::info!("A2A: Canceled task {}", stored.id);
            JsonRpcResponse::from_result(id, &*stored)
        }
        None => A2aError::TaskNotFound(task.id).to_response(id),
    }
}
