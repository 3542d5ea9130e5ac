//! Configuration loading and layering.

use std::path::Path;

use crate::config::schema::{Config, SimulationConfig};
use crate::config::validation::validate_config;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config load error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

/// Built-in defaults that differ between the two services.
#[derive(Debug, Clone)]
pub struct ServiceDefaults {
    pub name: &'static str,
    pub bind_address: &'static str,
    pub simulation: SimulationConfig,
}

impl ServiceDefaults {
    pub fn orders() -> Self {
        Self {
            name: "orders-service",
            bind_address: "0.0.0.0:8081",
            simulation: SimulationConfig {
                delay_min_ms: 50,
                delay_max_ms: 200,
                failure_rate: 0.0,
            },
        }
    }

    pub fn notifications() -> Self {
        Self {
            name: "notifications-service",
            bind_address: "0.0.0.0:8082",
            simulation: SimulationConfig {
                delay_min_ms: 100,
                delay_max_ms: 300,
                failure_rate: 0.1,
            },
        }
    }
}

/// Environment variables honored at startup, mapped to config keys.
const ENV_OVERRIDES: [(&str, &str); 6] = [
    ("ENV", "service.environment"),
    ("TENANT", "service.tenant"),
    ("BIND_ADDRESS", "server.bind_address"),
    ("OTEL_EXPORTER_OTLP_ENDPOINT", "telemetry.otlp_endpoint"),
    ("DATABASE_URL", "database.url"),
    ("NOTIFICATIONS_URL", "downstream.notifications_url"),
];

/// Load and validate configuration.
///
/// Layering, lowest precedence first: service defaults, then the optional
/// TOML file, then well-known environment variables.
pub fn load_config(path: Option<&Path>, defaults: &ServiceDefaults) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder()
        .set_default("service.name", defaults.name)?
        .set_default("server.bind_address", defaults.bind_address)?
        .set_default("simulation.delay_min_ms", defaults.simulation.delay_min_ms)?
        .set_default("simulation.delay_max_ms", defaults.simulation.delay_max_ms)?
        .set_default("simulation.failure_rate", defaults.simulation.failure_rate)?;

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    for (var, key) in ENV_OVERRIDES {
        if let Ok(value) = std::env::var(var) {
            builder = builder.set_override(key, value)?;
        }
    }

    let config: Config = builder.build()?.try_deserialize()?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
