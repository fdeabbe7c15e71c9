//! Handler for `message/stream`, the SSE variant of `message/send`.

use super::{ExecutionRx, prepare_request, run_executor};
use crate::a2a::events::TaskStore;
use crate::a2a::executor::AgentExecutor;
use crate::a2a::types::*;
use std::sync::Arc;

/// Handle `message/stream`: validate, start the executor and hand back the
/// receiver the SSE response reads from.
pub async fn handle_stream_message(
    id: serde_json::Value,
    params: serde_json::Value,
    store: TaskStore,
    executor: Arc<dyn AgentExecutor>,
) -> Result<(serde_json::Value, ExecutionRx), JsonRpcResponse> {
    let (_, context) = prepare_request(params, &store)
        .await
        .map_err(|e| e.to_response(id.clone()))?;

    tracing::info!(
        "A2A: message/stream for task {} (context {})",
        context.task_id,
        context.context_id
    );
    Ok((id, run_executor(executor, context, store)))
}
