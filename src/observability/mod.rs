//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! init.rs     → propagator, OTLP pipelines, subscriber stack
//! tracing.rs  → W3C trace context across the HTTP hop
//! logging.rs  → JSON records enriched with trace ids + service metadata
//! metrics.rs  → request counters and latency histograms
//!
//! Consumers:
//!     → stdout (one JSON object per line)
//!     → OTLP collector (traces, metrics, logs over gRPC)
//! ```
//!
//! # Design Decisions
//! - Everything degrades gracefully: with exporters disabled the services
//!   still log locally and still propagate context
//! - Enrichment never overwrites fields the caller set explicitly

pub mod init;
pub mod logging;
pub mod metrics;
pub mod tracing;

pub use init::{init_telemetry, TelemetryError, TelemetryGuard};
pub use logging::{JsonLogLayer, ServiceMeta};
pub use metrics::HttpMetrics;
