//! Server span middleware.
//!
//! Wraps every route in a span that adopts the caller's W3C trace context,
//! records the response status, and updates the request metrics. A guard
//! settles the span even when the request future is dropped mid-flight, so
//! abandoned requests still export with an error status instead of leaking.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use tower::{Layer, Service};
use tracing::field::Empty;
use tracing::{info_span, Instrument, Span};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::observability::metrics::HttpMetrics;
use crate::observability::tracing::extract_context;

/// Applies [`TraceRequest`] to every route of a router.
#[derive(Clone)]
pub struct TraceRequestLayer {
    metrics: HttpMetrics,
}

impl TraceRequestLayer {
    pub fn new(metrics: HttpMetrics) -> Self {
        Self { metrics }
    }
}

impl<S> Layer<S> for TraceRequestLayer {
    type Service = TraceRequest<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TraceRequest {
            inner,
            metrics: self.metrics.clone(),
        }
    }
}

/// Per-request server span plus metrics around the inner service.
#[derive(Clone)]
pub struct TraceRequest<S> {
    inner: S,
    metrics: HttpMetrics,
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for TraceRequest<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let parent = extract_context(req.headers());
        let method = req.method().to_string();
        // Runs after routing, so the matched route template is available.
        let route = req
            .extensions()
            .get::<MatchedPath>()
            .map(|path| path.as_str().to_string())
            .unwrap_or_else(|| req.uri().path().to_string());

        let span = info_span!(
            "http.request",
            otel.name = %format!("{method} {route}"),
            otel.kind = "server",
            http.request.method = %method,
            http.route = %route,
            url.path = %req.uri().path(),
            http.response.status_code = Empty,
            otel.status_code = Empty,
            otel.status_message = Empty,
        );
        span.set_parent(parent);

        self.metrics.request_started(&method);
        let guard = RequestGuard {
            span: span.clone(),
            metrics: self.metrics.clone(),
            method,
            route,
            start: Instant::now(),
            settled: false,
        };

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(
            async move {
                let mut guard = guard;
                let result = inner.call(req).await;
                match &result {
                    Ok(response) => guard.settle(response.status().as_u16()),
                    Err(_) => guard.settle_error(),
                }
                result
            }
            .instrument(span),
        )
    }
}

/// Settles the request span and metrics exactly once per request.
struct RequestGuard {
    span: Span,
    metrics: HttpMetrics,
    method: String,
    route: String,
    start: Instant,
    settled: bool,
}

impl RequestGuard {
    fn settle(&mut self, status: u16) {
        self.settled = true;
        self.span.record("http.response.status_code", status as i64);
        if status >= 500 {
            self.span.record("otel.status_code", "ERROR");
        }
        self.metrics
            .request_completed(&self.method, &self.route, status, self.start);
    }

    fn settle_error(&mut self) {
        self.settled = true;
        self.span.record("otel.status_code", "ERROR");
        self.span.record("otel.status_message", "service error");
        self.metrics
            .request_aborted(&self.method, &self.route, "error", self.start);
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        if !self.settled {
            self.span.record("otel.status_code", "ERROR");
            self.span.record("otel.status_message", "request cancelled");
            self.metrics
                .request_aborted(&self.method, &self.route, "cancelled", self.start);
        }
    }
}
