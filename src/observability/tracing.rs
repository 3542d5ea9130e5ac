//! W3C trace-context propagation.
//!
//! # Responsibilities
//! - Extract trace context from incoming request headers
//! - Inject the active trace context into outgoing request headers
//! - Expose the ids of the span currently in scope
//!
//! # Design Decisions
//! - All codec work goes through the globally registered propagator
//! - Absent or malformed headers yield an empty context, never an error

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::global;
use opentelemetry::propagation::{Extractor, Injector};
use opentelemetry::trace::TraceContextExt;
use opentelemetry::Context;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Carrier adapter reading propagation headers from a request.
struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|name| name.as_str()).collect()
    }
}

/// Carrier adapter writing propagation headers onto a request.
struct HeaderInjector<'a>(&'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let Ok(name) = HeaderName::from_bytes(key.as_bytes()) {
            if let Ok(value) = HeaderValue::from_str(&value) {
                self.0.insert(name, value);
            }
        }
    }
}

/// Extract the remote trace context from inbound request headers.
///
/// A request without usable `traceparent` data yields a context with no
/// active span, which starts a new trace root downstream.
pub fn extract_context(headers: &HeaderMap) -> Context {
    global::get_text_map_propagator(|propagator| propagator.extract(&HeaderExtractor(headers)))
}

/// Inject `cx` into outbound request headers as W3C trace-context fields.
pub fn inject_context(cx: &Context, headers: &mut HeaderMap) {
    global::get_text_map_propagator(|propagator| {
        propagator.inject_context(cx, &mut HeaderInjector(headers))
    });
}

/// Whether a span with a valid trace context is currently in scope.
pub fn has_active_span() -> bool {
    let cx = tracing::Span::current().context();
    let span = cx.span();
    span.span_context().is_valid()
}

/// Trace and span ids of the span currently in scope, as lowercase hex.
pub fn current_trace_ids() -> Option<(String, String)> {
    let cx = tracing::Span::current().context();
    let span = cx.span();
    let span_context = span.span_context();
    if span_context.is_valid() {
        Some((
            span_context.trace_id().to_string(),
            span_context.span_id().to_string(),
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_sdk::propagation::TraceContextPropagator;

    fn init_propagator() {
        global::set_text_map_propagator(TraceContextPropagator::new());
    }

    fn headers_with(traceparent: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "traceparent",
            HeaderValue::from_str(traceparent).unwrap(),
        );
        headers
    }

    #[test]
    fn extract_reads_valid_traceparent() {
        init_propagator();
        let headers =
            headers_with("00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01");

        let cx = extract_context(&headers);
        let span = cx.span();
        let span_context = span.span_context();

        assert!(span_context.is_valid());
        assert!(span_context.is_remote());
        assert!(span_context.is_sampled());
        assert_eq!(
            span_context.trace_id().to_string(),
            "0af7651916cd43dd8448eb211c80319c"
        );
        assert_eq!(span_context.span_id().to_string(), "b7ad6b7169203331");
    }

    #[test]
    fn extract_honors_unsampled_flag() {
        init_propagator();
        let headers =
            headers_with("00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-00");

        let cx = extract_context(&headers);
        let span = cx.span();
        assert!(span.span_context().is_valid());
        assert!(!span.span_context().is_sampled());
    }

    #[test]
    fn extract_without_header_yields_no_span() {
        init_propagator();
        let cx = extract_context(&HeaderMap::new());
        let span = cx.span();
        assert!(!span.span_context().is_valid());
    }

    #[test]
    fn extract_rejects_malformed_traceparent() {
        init_propagator();
        for bad in [
            "not-a-context",
            "00-abc-def-01",
            "00-00000000000000000000000000000000-b7ad6b7169203331-01",
            "00-0af7651916cd43dd8448eb211c80319c-0000000000000000-01",
        ] {
            let cx = extract_context(&headers_with(bad));
            let span = cx.span();
            assert!(!span.span_context().is_valid(), "accepted: {bad}");
        }
    }

    #[test]
    fn current_trace_ids_follow_the_active_span() {
        use opentelemetry::trace::TracerProvider as _;
        use opentelemetry_sdk::trace::SdkTracerProvider;
        use tracing_subscriber::layer::SubscriberExt;

        let provider = SdkTracerProvider::builder().build();
        let tracer = provider.tracer("test");
        let subscriber = tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(tracer));

        tracing::subscriber::with_default(subscriber, || {
            assert!(!has_active_span());
            assert!(current_trace_ids().is_none());

            let span = tracing::info_span!("unit-of-work");
            let _enter = span.enter();

            assert!(has_active_span());
            let (trace_id, span_id) = current_trace_ids().unwrap();
            assert_eq!(trace_id.len(), 32);
            assert_eq!(span_id.len(), 16);
        });
    }

    #[test]
    fn inject_round_trips_extracted_context() {
        init_propagator();
        let original = "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01";
        let cx = extract_context(&headers_with(original));

        let mut out = HeaderMap::new();
        inject_context(&cx, &mut out);

        let injected = out.get("traceparent").and_then(|v| v.to_str().ok());
        assert_eq!(injected, Some(original));
    }

    #[test]
    fn inject_with_empty_context_writes_nothing() {
        init_propagator();
        let mut out = HeaderMap::new();
        inject_context(&Context::new(), &mut out);
        assert!(out.get("traceparent").is_none());
    }
}
