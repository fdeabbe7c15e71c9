//! Tracing subscriber setup.
//!
//! Console output (plain or JSON), an optional daily-rolling log file, and,
//! when telemetry is installed, span and log export through OpenTelemetry.

use crate::config::LoggingConfig;
use crate::telemetry::Telemetry;
use anyhow::Context;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const LOG_FILE_PREFIX: &str = "tavily-agent.log";

/// Crates whose own logs must never be exported, or exporting them would
/// produce more logs.
const EXPORT_SILENCED: &[&str] = &["h2", "hyper", "tonic", "tower", "reqwest", "opentelemetry"];

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// `RUST_LOG` when set, otherwise `level` (or `debug` when forced).
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn export_filter(level: &str) -> EnvFilter {
    EXPORT_SILENCED
        .iter()
        .filter_map(|target| format!("{}=off", target).parse().ok())
        .fold(env_filter(level), |filter, directive| filter.add_directive(directive))
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must outlive
/// the program's logging.
pub fn init(
    config: &LoggingConfig,
    debug: bool,
    telemetry: Option<&Telemetry>,
) -> anyhow::Result<Option<WorkerGuard>> {
    let level = if debug { "debug" } else { config.level.as_str() };
    let mut layers: Vec<BoxedLayer> = Vec::new();

    let console = tracing_subscriber::fmt::layer().with_target(true);
    layers.push(if config.json {
        console.json().with_filter(env_filter(level)).boxed()
    } else {
        console.with_filter(env_filter(level)).boxed()
    });

    let mut guard = None;
    if let Some(directory) = &config.directory {
        std::fs::create_dir_all(directory)
            .with_context(|| format!("Failed to create log directory {:?}", directory))?;
        let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        guard = Some(file_guard);
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(env_filter(level))
                .boxed(),
        );
    }

    if let Some(telemetry) = telemetry {
        layers.push(
            tracing_opentelemetry::layer()
                .with_tracer(telemetry.tracer())
                .with_filter(export_filter(level))
                .boxed(),
        );
        layers.push(
            OpenTelemetryTracingBridge::new(telemetry.logger_provider())
                .with_filter(export_filter(level))
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_filter_silences_transport_crates() {
        let rendered = export_filter("info").to_string();
        for target in EXPORT_SILENCED {
            assert!(rendered.contains(&format!("{}=off", target)), "{}", rendered);
        }
    }
}
