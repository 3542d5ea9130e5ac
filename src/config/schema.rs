//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a service.
//! All types derive Serde traits for deserialization from config files.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Root configuration for a demo service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    /// Service identity (name, environment, tenant).
    pub service: ServiceConfig,

    /// Listener configuration (bind address).
    pub server: ServerConfig,

    /// Telemetry export and logging settings.
    pub telemetry: TelemetryConfig,

    /// Order persistence settings.
    pub database: DatabaseConfig,

    /// Downstream service endpoints.
    pub downstream: DownstreamConfig,

    /// Simulated processing delays and failures.
    pub simulation: SimulationConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,
}

/// Service identity stamped on logs and exported telemetry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Logical service name (e.g., "orders-service").
    pub name: String,

    /// Deployment environment (e.g., "dev", "prod").
    pub environment: String,

    /// Tenant identifier.
    pub tenant: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "demo-service".to_string(),
            environment: "dev".to_string(),
            tenant: "default".to_string(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8081").
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Export traces, metrics and logs over OTLP.
    pub enabled: bool,

    /// OTLP/gRPC collector endpoint.
    pub otlp_endpoint: String,

    /// Default log level when RUST_LOG is unset.
    pub log_level: String,

    /// Log output format: "json" or "pretty".
    pub log_format: String,

    /// Head sampling ratio for new trace roots (0.0 to 1.0).
    pub sampling_ratio: f64,

    /// Metric export interval in seconds.
    pub metrics_interval_secs: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            otlp_endpoint: "http://localhost:4317".to_string(),
            log_level: "info".to_string(),
            log_format: "json".to_string(),
            sampling_ratio: 1.0,
            metrics_interval_secs: 10,
        }
    }
}

/// Order persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Postgres connection string. Unset means in-memory storage.
    pub url: Option<String>,

    /// Maximum pool connections.
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
        }
    }
}

/// Downstream service endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DownstreamConfig {
    /// Base URL of the notifications service.
    pub notifications_url: String,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            notifications_url: "http://localhost:8082".to_string(),
        }
    }
}

/// Simulated work: random processing delay and a failure probability.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Lower bound of the simulated delay in milliseconds.
    pub delay_min_ms: u64,

    /// Upper bound of the simulated delay in milliseconds.
    pub delay_max_ms: u64,

    /// Probability that an operation fails (0.0 to 1.0).
    pub failure_rate: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            delay_min_ms: 50,
            delay_max_ms: 200,
            failure_rate: 0.0,
        }
    }
}

impl SimulationConfig {
    /// Sleep for a random duration inside the configured window.
    pub async fn apply_delay(&self) {
        let delay_ms = {
            let mut rng = rand::thread_rng();
            rng.gen_range(self.delay_min_ms..=self.delay_max_ms)
        };
        if delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
        }
    }

    /// Roll the configured failure probability.
    pub fn roll_failure(&self) -> bool {
        self.failure_rate > 0.0 && rand::thread_rng().gen::<f64>() < self.failure_rate
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Outbound client timeout in seconds.
    pub client_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            client_secs: 10,
        }
    }
}
