//! Ask service HTTP server powered by axum.
//!
//! Serves:
//! - `POST /ask`    - answer one question with a single completion
//! - `GET  /health` - Health check

use crate::brain::provider::{LLMRequest, Message, Provider};
use crate::config::AskConfig;
use crate::telemetry::metrics;
use axum::{
    Router,
    extract::State,
    response::Json,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, field};

const ANSWER_PREVIEW_CHARS: usize = 50;

/// Shared state for the ask service.
#[derive(Clone)]
pub struct AskState {
    pub provider: Arc<dyn Provider>,
    pub model: String,
    pub service_name: String,
}

impl AskState {
    pub fn new(config: &AskConfig, provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            service_name: config.service_name.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Question {
    pub text: String,
}

pub fn build_router(state: AskState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ask", post(ask))
        .with_state(state)
}

/// Start the ask server and block until shutdown.
pub async fn start_ask_server(config: &AskConfig, provider: Arc<dyn Provider>) -> anyhow::Result<()> {
    let app = build_router(AskState::new(config, provider));
    let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid ask listen address: {}", e))?;

    tracing::info!("{} starting on http://{}", config.service_name, addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(crate::shutdown_signal())
        .await?;

    tracing::info!("{} stopped", config.service_name);
    Ok(())
}

async fn health(State(state): State<AskState>) -> Json<Value> {
    tracing::info!("Health check OK");
    Json(json!({ "ok": true, "service": state.service_name }))
}

async fn ask(State(state): State<AskState>, Json(question): Json<Question>) -> Json<Value> {
    let span = tracing::info_span!(
        "ask_question",
        user.question = %question.text,
        response.latency_ms = field::Empty,
        response.answer_preview = field::Empty,
        otel.status_code = field::Empty,
    );
    answer(&state, question.text).instrument(span).await
}

async fn answer(state: &AskState, question: String) -> Json<Value> {
    let span = tracing::Span::current();
    let started = Instant::now();
    tracing::info!("Received question: {}", question);

    let request = LLMRequest::new(state.model.clone(), vec![Message::user(question)]);
    let answer = match state.provider.complete(request).await {
        Ok(response) => response.text(),
        Err(e) => {
            tracing::error!(error = %e, "OpenAI call failed: {}", e);
            span.record("otel.status_code", "ERROR");
            return Json(json!({ "error": "llm_failed" }));
        }
    };

    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
    metrics::record_question(&state.service_name);
    metrics::record_answer_latency(&state.service_name, latency_ms);

    let preview: String = answer.chars().take(ANSWER_PREVIEW_CHARS).collect();
    span.record("response.latency_ms", latency_ms);
    span.record("response.answer_preview", preview.as_str());
    tracing::info!("Answer produced in {:.2} ms", latency_ms);

    Json(json!({ "answer": answer, "latency_ms": latency_ms }))
}
