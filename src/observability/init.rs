//! Telemetry bootstrap.
//!
//! # Responsibilities
//! - Register the W3C trace-context propagator
//! - Build OTLP exporters for traces, metrics, and logs
//! - Install the tracing subscriber stack (filter, span bridge, log output)
//!
//! # Design Decisions
//! - Sampling is parent-based so a sampled upstream decision is honored
//! - Export runs on batch pipelines; the returned guard flushes them on drop
//! - With telemetry disabled only the local log output is installed

use std::time::Duration;

use opentelemetry::propagation::TextMapCompositePropagator;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{
    ExporterBuildError, LogExporter, MetricExporter, SpanExporter, WithExportConfig,
};
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use opentelemetry_semantic_conventions::resource::{HOST_NAME, SERVICE_VERSION};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer as _};

use crate::config::Config;
use crate::observability::logging::{JsonLogLayer, ServiceMeta};

/// Telemetry setup failure.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("otlp exporter setup failed: {0}")]
    Exporter(#[from] ExporterBuildError),
}

/// Guard that flushes and shuts down the telemetry providers on drop.
///
/// Keep it alive for the lifetime of the process.
#[derive(Default)]
#[must_use = "dropping TelemetryGuard shuts down telemetry"]
pub struct TelemetryGuard {
    tracer_provider: Option<SdkTracerProvider>,
    meter_provider: Option<SdkMeterProvider>,
    logger_provider: Option<SdkLoggerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take() {
            if let Err(err) = provider.shutdown() {
                eprintln!("tracer provider shutdown failed: {err:?}");
            }
        }
        if let Some(provider) = self.meter_provider.take() {
            if let Err(err) = provider.shutdown() {
                eprintln!("meter provider shutdown failed: {err:?}");
            }
        }
        if let Some(provider) = self.logger_provider.take() {
            if let Err(err) = provider.shutdown() {
                eprintln!("logger provider shutdown failed: {err:?}");
            }
        }
    }
}

/// Initialize propagation, the OTLP pipelines, and the global subscriber.
pub fn init_telemetry(config: &Config, meta: ServiceMeta) -> Result<TelemetryGuard, TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.telemetry.log_level));

    if !config.telemetry.enabled {
        match config.telemetry.log_format.as_str() {
            "json" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(JsonLogLayer::new(meta))
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer())
                    .init();
            }
        }
        tracing::info!(otel.enabled = false, "telemetry initialized without exporters");
        return Ok(TelemetryGuard::default());
    }

    let propagator =
        TextMapCompositePropagator::new(vec![Box::new(TraceContextPropagator::new())]);
    global::set_text_map_propagator(propagator);

    let resource = Resource::builder()
        .with_service_name(meta.service_name.clone())
        .with_attribute(KeyValue::new(SERVICE_VERSION, meta.service_version.clone()))
        .with_attribute(KeyValue::new(HOST_NAME, meta.host.clone()))
        .with_attribute(KeyValue::new(
            "deployment.environment",
            meta.environment.clone(),
        ))
        .with_attribute(KeyValue::new("tenant", meta.tenant.clone()))
        .build();

    let endpoint = config.telemetry.otlp_endpoint.clone();

    let span_exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint.clone())
        .build()?;
    let tracer_provider = SdkTracerProvider::builder()
        .with_resource(resource.clone())
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
            config.telemetry.sampling_ratio,
        ))))
        .with_batch_exporter(span_exporter)
        .build();
    let tracer = tracer_provider.tracer("otel-demo");

    let metric_exporter = MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint.clone())
        .build()?;
    let reader = PeriodicReader::builder(metric_exporter)
        .with_interval(Duration::from_secs(config.telemetry.metrics_interval_secs))
        .build();
    let meter_provider = SdkMeterProvider::builder()
        .with_resource(resource.clone())
        .with_reader(reader)
        .build();

    let log_exporter = LogExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;
    let logger_provider = SdkLoggerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(log_exporter)
        .build();

    global::set_tracer_provider(tracer_provider.clone());
    global::set_meter_provider(meter_provider.clone());

    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    // Keep the exporters' own gRPC traffic out of the exported log stream.
    let bridge = OpenTelemetryTracingBridge::new(&logger_provider).with_filter(EnvFilter::new(
        "info,h2=off,tonic=off,hyper=off,opentelemetry=off,opentelemetry_sdk=off",
    ));

    match config.telemetry.log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(otel_layer)
                .with(bridge)
                .with(JsonLogLayer::new(meta))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(otel_layer)
                .with(bridge)
                .with(fmt::layer())
                .init();
        }
    }

    tracing::info!(
        otel.enabled = true,
        otlp.endpoint = %config.telemetry.otlp_endpoint,
        "telemetry initialized"
    );

    Ok(TelemetryGuard {
        tracer_provider: Some(tracer_provider),
        meter_provider: Some(meter_provider),
        logger_provider: Some(logger_provider),
    })
}
