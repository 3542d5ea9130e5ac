//! Shared utilities for integration testing.
//!
//! One subscriber serves the whole test binary: spans land in an in-memory
//! exporter (export happens when a span closes) and log lines land in a
//! shared buffer, so tests can assert on both.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use opentelemetry::global;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use otel_demo::config::{load_config, Config, ServiceDefaults};
use otel_demo::http::TracedClient;
use otel_demo::lifecycle::Shutdown;
use otel_demo::notifications::{self, NotificationStore, NotificationsState};
use otel_demo::observability::{HttpMetrics, JsonLogLayer, ServiceMeta};
use otel_demo::orders::{self, OrderStore, OrdersState};

/// Captures JSON log lines written by the subscriber under test.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Parsed log records captured so far.
    pub fn records(&self) -> Vec<serde_json::Value> {
        let buffer = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buffer)
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    /// First record whose message equals `message`.
    #[allow(dead_code)]
    pub fn find_message(&self, message: &str) -> Option<serde_json::Value> {
        self.records()
            .into_iter()
            .find(|record| record["message"] == message)
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

pub struct TestTelemetry {
    pub exporter: InMemorySpanExporter,
    pub logs: LogCapture,
    _provider: SdkTracerProvider,
}

static TELEMETRY: OnceLock<TestTelemetry> = OnceLock::new();

/// Install the propagator, span exporter, and subscriber once per binary.
pub fn telemetry() -> &'static TestTelemetry {
    TELEMETRY.get_or_init(|| {
        global::set_text_map_propagator(TraceContextPropagator::new());

        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        let tracer = provider.tracer("test");
        global::set_tracer_provider(provider.clone());

        let logs = LogCapture::default();
        let meta = ServiceMeta {
            service_name: "orders-service".to_string(),
            service_version: "0.0.0-test".to_string(),
            environment: "test".to_string(),
            tenant: "default".to_string(),
            host: "test-host".to_string(),
        };

        let _ = tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .with(JsonLogLayer::new(meta).with_writer(logs.clone()))
            .try_init();

        TestTelemetry {
            exporter,
            logs,
            _provider: provider,
        }
    })
}

/// Config for tests: exporters off, no artificial delay or failures, memory
/// storage regardless of ambient environment variables.
pub fn test_config(defaults: &ServiceDefaults) -> Config {
    let mut config = load_config(None, defaults).unwrap();
    config.telemetry.enabled = false;
    config.simulation.delay_min_ms = 0;
    config.simulation.delay_max_ms = 0;
    config.simulation.failure_rate = 0.0;
    config.database.url = None;
    config
}

/// Serve the notifications service on an ephemeral port.
pub async fn start_notifications(config: Config) -> (SocketAddr, Shutdown) {
    let state = NotificationsState {
        store: NotificationStore::default(),
        simulation: config.simulation.clone(),
        metrics: HttpMetrics::new(),
    };
    serve(notifications::router(&config, state)).await
}

/// Serve the orders service on an ephemeral port, pointed at `notifications_url`.
pub async fn start_orders(config: Config, notifications_url: String) -> (SocketAddr, Shutdown) {
    let metrics = HttpMetrics::new();
    let client = TracedClient::new(
        metrics.clone(),
        Duration::from_secs(config.timeouts.client_secs),
    )
    .unwrap();
    let store = OrderStore::from_config(&config.database).await.unwrap();
    let state = OrdersState {
        store: Arc::new(store),
        client,
        notifications_url,
        simulation: config.simulation.clone(),
        metrics,
    };
    serve(orders::router(&config, state)).await
}

async fn serve(app: axum::Router) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let notified = shutdown.notified();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(notified)
            .await
            .unwrap();
    });
    (addr, shutdown)
}

/// All spans exported so far in this binary.
pub fn finished_spans() -> Vec<SpanData> {
    telemetry().exporter.get_finished_spans().unwrap_or_default()
}

/// Poll until a span matching `pred` has been exported.
pub async fn wait_for_span<F>(pred: F) -> SpanData
where
    F: Fn(&SpanData) -> bool,
{
    for _ in 0..100 {
        if let Some(span) = finished_spans().into_iter().find(|span| pred(span)) {
            return span;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected span was not exported");
}

/// Poll until a log record matching `pred` appears.
pub async fn wait_for_log<F>(logs: &LogCapture, pred: F) -> serde_json::Value
where
    F: Fn(&serde_json::Value) -> bool,
{
    for _ in 0..100 {
        if let Some(record) = logs.records().into_iter().find(|record| pred(record)) {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected log record was not captured");
}

/// String form of a span attribute value.
pub fn span_attr(span: &SpanData, key: &str) -> Option<String> {
    span.attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| kv.value.as_str().to_string())
}

/// Start a backend that records raw request heads and answers `200 {}`.
#[allow(dead_code)]
pub async fn start_header_capture_backend() -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captured = Arc::new(Mutex::new(Vec::new()));
    let heads = captured.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let heads = heads.clone();
                    tokio::spawn(async move {
                        let mut buf = Vec::new();
                        let mut chunk = [0u8; 1024];
                        while let Ok(n) = socket.read(&mut chunk).await {
                            if n == 0 {
                                break;
                            }
                            buf.extend_from_slice(&chunk[..n]);
                            if buf.windows(4).any(|window| window == b"\r\n\r\n") {
                                break;
                            }
                        }
                        heads
                            .lock()
                            .unwrap()
                            .push(String::from_utf8_lossy(&buf).to_string());
                        let _ = socket
                            .write_all(
                                b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}",
                            )
                            .await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, captured)
}

/// Poll until the capture backend has recorded at least one request head.
#[allow(dead_code)]
pub async fn wait_for_capture(captured: &Arc<Mutex<Vec<String>>>) -> String {
    for _ in 0..100 {
        if let Some(head) = captured.lock().unwrap().first().cloned() {
            return head;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("backend saw no request");
}

/// Case-insensitive header lookup in a raw request head.
#[allow(dead_code)]
pub fn header_value(head: &str, name: &str) -> Option<String> {
    head.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().to_string())
    })
}

/// Plain client for driving requests in tests.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
