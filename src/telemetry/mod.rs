//! OTLP export of traces, metrics and logs.
//!
//! Providers are built once at startup, registered globally, and flushed by
//! [`Telemetry::shutdown`] on exit.

pub mod metrics;

use crate::config::TelemetryConfig;
use anyhow::Context;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::logs::LoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::{self as sdktrace, TracerProvider};
use opentelemetry_sdk::{Resource, runtime};
use std::time::Duration;

/// Installed OpenTelemetry providers.
pub struct Telemetry {
    tracer_provider: TracerProvider,
    meter_provider: SdkMeterProvider,
    logger_provider: LoggerProvider,
    service_name: String,
}

impl Telemetry {
    /// Build OTLP/gRPC exporters for `service_name` and register the tracer
    /// and meter providers globally.
    pub fn init(service_name: &str, config: &TelemetryConfig) -> anyhow::Result<Self> {
        let endpoint = config.resolved_endpoint();
        let resource = Resource::new(vec![KeyValue::new(
            "service.name",
            service_name.to_string(),
        )]);

        let tracer_provider = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .tonic()
                    .with_endpoint(endpoint.clone()),
            )
            .with_trace_config(sdktrace::Config::default().with_resource(resource.clone()))
            .install_batch(runtime::Tokio)
            .context("Failed to install OTLP trace exporter")?;

        let meter_provider = opentelemetry_otlp::new_pipeline()
            .metrics(runtime::Tokio)
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .tonic()
                    .with_endpoint(endpoint.clone()),
            )
            .with_resource(resource.clone())
            .with_period(Duration::from_secs(config.export_interval_secs.max(1)))
            .build()
            .context("Failed to install OTLP metrics exporter")?;

        let logger_provider = opentelemetry_otlp::new_pipeline()
            .logging()
            .with_resource(resource)
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .tonic()
                    .with_endpoint(endpoint.clone()),
            )
            .install_batch(runtime::Tokio)
            .context("Failed to install OTLP log exporter")?;

        global::set_tracer_provider(tracer_provider.clone());
        global::set_meter_provider(meter_provider.clone());

        tracing::debug!("OTLP exporters for {} pointed at {}", service_name, endpoint);
        Ok(Self {
            tracer_provider,
            meter_provider,
            logger_provider,
            service_name: service_name.to_string(),
        })
    }

    pub fn tracer(&self) -> sdktrace::Tracer {
        self.tracer_provider.tracer(self.service_name.clone())
    }

    pub fn logger_provider(&self) -> &LoggerProvider {
        &self.logger_provider
    }

    /// Flush and stop every exporter.
    pub fn shutdown(self) {
        if let Err(e) = self.tracer_provider.shutdown() {
            eprintln!("Failed to shut down tracer provider: {}", e);
        }
        if let Err(e) = self.meter_provider.shutdown() {
            eprintln!("Failed to shut down meter provider: {}", e);
        }
        if let Err(e) = self.logger_provider.shutdown() {
            eprintln!("Failed to shut down logger provider: {}", e);
        }
        global::shutdown_tracer_provider();
    }
}
