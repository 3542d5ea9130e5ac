//! HTTP request metrics.
//!
//! # Metrics
//! - `http.server.request.count` (counter): completed requests by method, route, status
//! - `http.server.request.duration` (histogram): server latency in seconds
//! - `http.server.active_requests` (up-down counter): requests currently in flight
//! - `http.client.request.duration` (histogram): outbound call latency by target, outcome
//!
//! # Design Decisions
//! - Instruments come from the global meter provider, so recording is a no-op
//!   until telemetry is initialized
//! - Aborted requests are counted with an `error.type` attribute instead of a
//!   status code

use std::time::Instant;

use opentelemetry::metrics::{Counter, Histogram, UpDownCounter};
use opentelemetry::{global, KeyValue};

/// Instruments shared by the request middleware and the outbound client.
#[derive(Clone)]
pub struct HttpMetrics {
    requests: Counter<u64>,
    request_duration: Histogram<f64>,
    active_requests: UpDownCounter<i64>,
    client_duration: Histogram<f64>,
}

impl HttpMetrics {
    pub fn new() -> Self {
        let meter = global::meter("otel-demo");
        Self {
            requests: meter
                .u64_counter("http.server.request.count")
                .with_description("Completed HTTP requests")
                .build(),
            request_duration: meter
                .f64_histogram("http.server.request.duration")
                .with_description("HTTP request duration")
                .with_unit("s")
                .build(),
            active_requests: meter
                .i64_up_down_counter("http.server.active_requests")
                .with_description("HTTP requests currently being served")
                .build(),
            client_duration: meter
                .f64_histogram("http.client.request.duration")
                .with_description("Outbound HTTP call duration")
                .with_unit("s")
                .build(),
        }
    }

    /// Record that a request entered the service.
    pub fn request_started(&self, method: &str) {
        self.active_requests
            .add(1, &[KeyValue::new("http.request.method", method.to_string())]);
    }

    /// Record a request that produced a response.
    pub fn request_completed(&self, method: &str, route: &str, status: u16, start: Instant) {
        let attrs = [
            KeyValue::new("http.request.method", method.to_string()),
            KeyValue::new("http.route", route.to_string()),
            KeyValue::new("http.response.status_code", status as i64),
        ];
        self.requests.add(1, &attrs);
        self.request_duration
            .record(start.elapsed().as_secs_f64(), &attrs);
        self.active_requests
            .add(-1, &[KeyValue::new("http.request.method", method.to_string())]);
    }

    /// Record a request that ended without a response, e.g. a dropped
    /// connection or a failed inner service.
    pub fn request_aborted(&self, method: &str, route: &str, reason: &'static str, start: Instant) {
        let attrs = [
            KeyValue::new("http.request.method", method.to_string()),
            KeyValue::new("http.route", route.to_string()),
            KeyValue::new("error.type", reason),
        ];
        self.requests.add(1, &attrs);
        self.request_duration
            .record(start.elapsed().as_secs_f64(), &attrs);
        self.active_requests
            .add(-1, &[KeyValue::new("http.request.method", method.to_string())]);
    }

    /// Record one outbound HTTP call.
    pub fn client_call(&self, target: &str, outcome: &str, start: Instant) {
        self.client_duration.record(
            start.elapsed().as_secs_f64(),
            &[
                KeyValue::new("server.address", target.to_string()),
                KeyValue::new("outcome", outcome.to_string()),
            ],
        );
    }
}

impl Default for HttpMetrics {
    fn default() -> Self {
        Self::new()
    }
}
