//! Traced outbound HTTP client.
//!
//! Wraps `reqwest` so every call made inside an active span gets a client
//! span and carries the trace context in its headers. Calls made outside any
//! span go out untouched; a new trace is never started here.

use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use serde::Serialize;
use tracing::field::Empty;
use tracing::{info_span, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::observability::metrics::HttpMetrics;
use crate::observability::tracing::{has_active_span, inject_context};

#[derive(Clone)]
pub struct TracedClient {
    inner: reqwest::Client,
    metrics: HttpMetrics,
}

impl TracedClient {
    pub fn new(metrics: HttpMetrics, timeout: Duration) -> Result<Self, reqwest::Error> {
        let inner = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { inner, metrics })
    }

    /// POST `body` as JSON to `url`.
    ///
    /// Transport failures and HTTP error statuses both come back to the
    /// caller unchanged; this layer only records them.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let target = url::Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(|host| host.to_string()))
            .unwrap_or_else(|| "invalid".to_string());
        let start = Instant::now();

        let span = has_active_span().then(|| {
            info_span!(
                "http.client.request",
                otel.name = %format!("POST {target}"),
                otel.kind = "client",
                http.request.method = "POST",
                server.address = %target,
                url.full = %url,
                http.response.status_code = Empty,
                otel.status_code = Empty,
                otel.status_message = Empty,
            )
        });

        let mut headers = HeaderMap::new();
        if let Some(span) = &span {
            inject_context(&span.context(), &mut headers);
        }

        let send = self.inner.post(url).headers(headers).json(body).send();
        let result = match &span {
            Some(span) => send.instrument(span.clone()).await,
            None => send.await,
        };

        match &result {
            Ok(response) => {
                let status = response.status();
                if let Some(span) = &span {
                    span.record("http.response.status_code", status.as_u16() as i64);
                    if status.is_server_error() {
                        span.record("otel.status_code", "ERROR");
                    }
                }
                self.metrics.client_call(&target, status.as_str(), start);
            }
            Err(err) => {
                if let Some(span) = &span {
                    span.record("otel.status_code", "ERROR");
                    span.record("otel.status_message", err.to_string().as_str());
                }
                self.metrics.client_call(&target, "transport_error", start);
            }
        }

        result
    }
}
