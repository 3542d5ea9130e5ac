//! Two demo services wired for end-to-end observability.
//!
//! The orders service stores orders and calls the notifications service over
//! HTTP; trace context, enriched logs, and metrics follow the request across
//! the hop and out to an OTLP collector.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod notifications;
pub mod observability;
pub mod orders;

pub use config::Config;
pub use lifecycle::Shutdown;
