//! OpenTelemetry metrics helpers.
//!
//! Instruments go through the global meter, so they are no-ops until a
//! meter provider is installed.

use opentelemetry::metrics::{Counter, Histogram};
use opentelemetry::{KeyValue, global};
use std::sync::OnceLock;
use std::time::Duration;

const METER_NAME: &str = "tavily_agent";

static A2A_REQUEST_COUNTER: OnceLock<Counter<u64>> = OnceLock::new();
static A2A_REQUEST_HISTOGRAM: OnceLock<Histogram<f64>> = OnceLock::new();
static QUESTIONS_COUNTER: OnceLock<Counter<u64>> = OnceLock::new();
static RESPONSE_LATENCY_HISTOGRAM: OnceLock<Histogram<f64>> = OnceLock::new();

fn a2a_request_counter() -> &'static Counter<u64> {
    A2A_REQUEST_COUNTER.get_or_init(|| {
        global::meter(METER_NAME)
            .u64_counter("a2a.request_total")
            .with_description("JSON-RPC requests handled by the relay")
            .init()
    })
}

fn a2a_request_histogram() -> &'static Histogram<f64> {
    A2A_REQUEST_HISTOGRAM.get_or_init(|| {
        global::meter(METER_NAME)
            .f64_histogram("a2a.request_duration_ms")
            .with_unit("ms")
            .init()
    })
}

fn questions_counter() -> &'static Counter<u64> {
    QUESTIONS_COUNTER.get_or_init(|| {
        global::meter(METER_NAME)
            .u64_counter("questions_total")
            .with_description("Total questions asked")
            .init()
    })
}

fn response_latency_histogram() -> &'static Histogram<f64> {
    RESPONSE_LATENCY_HISTOGRAM.get_or_init(|| {
        global::meter(METER_NAME)
            .f64_histogram("response_latency_ms")
            .with_description("Latency of answers in ms")
            .with_unit("ms")
            .init()
    })
}

/// Record completion of a relay JSON-RPC request.
pub fn record_request(method: &str, duration: Duration, is_error: bool) {
    let attributes = &[
        KeyValue::new("method", method.to_string()),
        KeyValue::new("result", if is_error { "error" } else { "ok" }),
    ];
    a2a_request_counter().add(1, attributes);
    a2a_request_histogram().record(duration.as_secs_f64() * 1000.0, attributes);
}

/// Count one question received by the ask service.
pub fn record_question(service: &str) {
    questions_counter().add(1, &[KeyValue::new("service", service.to_string())]);
}

/// Record how long the ask service took to answer.
pub fn record_answer_latency(service: &str, latency_ms: f64) {
    response_latency_histogram()
        .record(latency_ms, &[KeyValue::new("service", service.to_string())]);
}
