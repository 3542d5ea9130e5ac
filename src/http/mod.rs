//! HTTP plumbing shared by both services.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → middleware.rs (server span, trace context adoption, metrics)
//!     → service handlers
//!     → error.rs (uniform JSON error responses)
//!
//! outbound request
//!     → client.rs (client span, trace context injection, metrics)
//! ```

pub mod client;
pub mod error;
pub mod middleware;

pub use client::TracedClient;
pub use error::ApiError;
pub use middleware::TraceRequestLayer;
