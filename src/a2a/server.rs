//! A2A relay HTTP server powered by axum.
//!
//! Serves:
//! - `GET  /.well-known/agent.json`      - Agent Card discovery
//! - `GET  /.well-known/agent-card.json` - same card, newer path
//! - `POST /`                            - JSON-RPC 2.0 endpoint
//! - `GET  /health`                      - Health check

use crate::a2a::{agent_card, events::TaskStore, executor::AgentExecutor, handler, types::*};
use crate::config::{A2aConfig, SecretString};
use crate::telemetry::metrics;
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Sse, sse},
    routing::{get, post},
};
use futures::stream;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Shared state for the relay.
#[derive(Clone)]
pub struct A2aState {
    pub task_store: TaskStore,
    pub executor: Arc<dyn AgentExecutor>,
    pub card: Arc<AgentCard>,
    pub api_key: Option<SecretString>,
}

impl A2aState {
    pub fn new(config: &A2aConfig, executor: Arc<dyn AgentExecutor>) -> Self {
        Self {
            task_store: handler::new_task_store(),
            executor,
            card: Arc::new(agent_card::build_agent_card(config)),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        }
    }
}

/// Bearer token auth middleware. Skipped when no api_key is configured.
async fn require_bearer(
    State(state): State<A2aState>,
    req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    let Some(ref expected) = state.api_key else {
        return next.run(req).await;
    };

    let authorized = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| expected.matches(token));

    if authorized {
        next.run(req).await
    } else {
        let body = JsonRpcResponse::error(
            serde_json::Value::Null,
            error_codes::INVALID_REQUEST,
            "Unauthorized: invalid or missing Bearer token",
        );
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if allowed_origins.is_empty() {
        CorsLayer::new()
    } else {
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Build the axum router for the relay.
pub fn build_router(state: A2aState, allowed_origins: &[String]) -> Router {
    let protected = Router::new()
        .route("/", post(handle_jsonrpc))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer,
        ));

    Router::new()
        .route("/.well-known/agent.json", get(get_agent_card))
        .route("/.well-known/agent-card.json", get(get_agent_card))
        .route("/health", get(health_check))
        .merge(protected)
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

/// Serve the relay until Ctrl-C.
pub async fn start_server(config: &A2aConfig, executor: Arc<dyn AgentExecutor>) -> anyhow::Result<()> {
    let state = A2aState::new(config, executor);
    let app = build_router(state, &config.allowed_origins);
    let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid A2A listen address: {}", e))?;

    tracing::info!("A2A relay starting on http://{}", addr);
    tracing::info!("   Agent Card: {}/.well-known/agent.json", config.public_url());
    tracing::info!("   JSON-RPC:   {}/", config.public_url());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(crate::shutdown_signal())
        .await?;

    tracing::info!("A2A relay stopped");
    Ok(())
}

async fn get_agent_card(State(state): State<A2aState>) -> Json<AgentCard> {
    Json((*state.card).clone())
}

/// POST / -- JSON-RPC 2.0 endpoint.
/// Returns JSON for most methods, SSE stream for `message/stream`.
async fn handle_jsonrpc(State(state): State<A2aState>, body: Bytes) -> axum::response::Response {
    let started = Instant::now();

    let value: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            metrics::record_request("invalid", started.elapsed(), true);
            return rpc_reply(JsonRpcResponse::error(
                serde_json::Value::Null,
                error_codes::PARSE_ERROR,
                format!("Parse error: {}", e),
            ));
        }
    };
    let id = value.get("id").cloned().unwrap_or_default();
    let req: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(r) => r,
        Err(e) => {
            metrics::record_request("invalid", started.elapsed(), true);
            return rpc_reply(JsonRpcResponse::error(
                id,
                error_codes::INVALID_REQUEST,
                format!("Invalid request: {}", e),
            ));
        }
    };

    if req.jsonrpc != "2.0" {
        metrics::record_request(&req.method, started.elapsed(), true);
        return rpc_reply(JsonRpcResponse::error(
            req.id,
            error_codes::INVALID_REQUEST,
            "Invalid JSON-RPC version, expected 2.0",
        ));
    }

    // message/stream returns SSE instead of JSON
    if req.method == "message/stream" {
        return handle_stream(state, req, started).await;
    }

    let method = req.method.clone();
    let response = handler::dispatch(req, state.task_store, state.executor).await;
    metrics::record_request(&method, started.elapsed(), response.error.is_some());
    rpc_reply(response)
}

fn rpc_reply(response: JsonRpcResponse) -> axum::response::Response {
    (StatusCode::OK, Json(response)).into_response()
}

/// Handle `message/stream` -- one SSE event per task event, closing after
/// the final one.
async fn handle_stream(
    state: A2aState,
    req: JsonRpcRequest,
    started: Instant,
) -> axum::response::Response {
    match handler::stream::handle_stream_message(req.id, req.params, state.task_store, state.executor)
        .await
    {
        Ok((id, rx)) => {
            metrics::record_request("message/stream", started.elapsed(), false);
            let stream = stream::unfold((id, rx, false), |(id, mut rx, done)| async move {
                if done {
                    return None;
                }
                let item = rx.recv().await?;
                let (rpc_response, finished) = match item {
                    Ok(applied) => {
                        let finished = applied.event.is_final();
                        (JsonRpcResponse::from_result(id.clone(), &applied.event), finished)
                    }
                    Err(e) => (e.to_response(id.clone()), true),
                };
                let data = serde_json::to_string(&rpc_response).unwrap_or_default();
                let sse_event = Ok::<_, std::convert::Infallible>(sse::Event::default().data(data));
                Some((sse_event, (id, rx, finished)))
            });
            Sse::new(stream)
                .keep_alive(sse::KeepAlive::default())
                .into_response()
        }
        Err(error_response) => {
            metrics::record_request("message/stream", started.elapsed(), true);
            rpc_reply(error_response)
        }
    }
}

/// GET /health
async fn health_check(State(state): State<A2aState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": state.card.name,
        "version": crate::VERSION,
    }))
}
