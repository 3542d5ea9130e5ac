//! Structured JSON logging.
//!
//! # Responsibilities
//! - Render every log event as one JSON object per line
//! - Enrich records with the trace and span ids of the active span
//! - Stamp static service metadata (name, version, environment, tenant, host)
//!
//! # Design Decisions
//! - Enrichment is a pure transform over the serialized record
//! - Caller-provided fields win over enrichment on key collisions
//! - Records emitted outside any span simply omit trace_id/span_id

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use opentelemetry::trace::{SpanContext, TraceContextExt};
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_opentelemetry::OpenTelemetrySpanExt;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::config::Config;

/// Static service identity attached to every log record.
#[derive(Debug, Clone)]
pub struct ServiceMeta {
    pub service_name: String,
    pub service_version: String,
    pub environment: String,
    pub tenant: String,
    pub host: String,
}

impl ServiceMeta {
    pub fn from_config(config: &Config) -> Self {
        Self {
            service_name: config.service.name.clone(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: config.service.environment.clone(),
            tenant: config.service.tenant.clone(),
            host: std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string()),
        }
    }
}

/// Add trace correlation and service metadata to a serialized log record.
///
/// Existing keys are never overwritten, so fields supplied at the call site
/// win. Applying the transform a second time is a no-op.
pub fn enrich(record: &mut Map<String, Value>, trace: Option<&SpanContext>, meta: &ServiceMeta) {
    if let Some(ctx) = trace {
        record
            .entry("trace_id")
            .or_insert_with(|| Value::String(ctx.trace_id().to_string()));
        record
            .entry("span_id")
            .or_insert_with(|| Value::String(ctx.span_id().to_string()));
    }

    record
        .entry("service_name")
        .or_insert_with(|| Value::String(meta.service_name.clone()));
    record
        .entry("service_version")
        .or_insert_with(|| Value::String(meta.service_version.clone()));
    record
        .entry("environment")
        .or_insert_with(|| Value::String(meta.environment.clone()));
    record
        .entry("tenant")
        .or_insert_with(|| Value::String(meta.tenant.clone()));
    record
        .entry("host")
        .or_insert_with(|| Value::String(meta.host.clone()));
    record
        .entry("pid")
        .or_insert_with(|| Value::from(std::process::id()));
    record.entry("thread").or_insert_with(|| {
        Value::String(
            std::thread::current()
                .name()
                .unwrap_or("unnamed")
                .to_string(),
        )
    });
}

/// Log layer that writes one enriched JSON object per event.
pub struct JsonLogLayer<W = fn() -> std::io::Stdout> {
    meta: Arc<ServiceMeta>,
    make_writer: W,
}

impl JsonLogLayer {
    pub fn new(meta: ServiceMeta) -> Self {
        Self {
            meta: Arc::new(meta),
            make_writer: std::io::stdout,
        }
    }
}

impl<W> JsonLogLayer<W> {
    /// Swap the output destination, e.g. to capture records in tests.
    pub fn with_writer<W2>(self, make_writer: W2) -> JsonLogLayer<W2>
    where
        W2: for<'a> MakeWriter<'a>,
    {
        JsonLogLayer {
            meta: self.meta,
            make_writer,
        }
    }
}

impl<S, W> Layer<S> for JsonLogLayer<W>
where
    S: Subscriber,
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut record = Map::new();
        record.insert(
            "timestamp".to_string(),
            Value::String(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)),
        );
        record.insert(
            "level".to_string(),
            Value::String(event.metadata().level().to_string()),
        );
        record.insert(
            "target".to_string(),
            Value::String(event.metadata().target().to_string()),
        );

        let mut visitor = JsonVisitor {
            record: &mut record,
        };
        event.record(&mut visitor);

        let cx = tracing::Span::current().context();
        let span = cx.span();
        let span_context = span.span_context();
        let trace = span_context.is_valid().then_some(span_context);
        enrich(&mut record, trace, &self.meta);

        if let Ok(line) = serde_json::to_string(&record) {
            let mut writer = self.make_writer.make_writer();
            let _ = writeln!(writer, "{line}");
        }
    }
}

/// Visitor that copies event fields into the JSON record in declaration
/// order.
struct JsonVisitor<'a> {
    record: &'a mut Map<String, Value>,
}

impl Visit for JsonVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record.insert(field.name().to_string(), Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record.insert(field.name().to_string(), Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record
            .insert(field.name().to_string(), Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record
            .insert(field.name().to_string(), Value::String(format!("{value:?}")));
    }
}
