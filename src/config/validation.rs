//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ratios in [0, 1], timeouts > 0)
//! - Check addresses and URLs parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function over the loaded Config

use std::net::SocketAddr;

use crate::config::schema::Config;

/// Validate a loaded configuration, collecting every problem found.
pub fn validate_config(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config.service.name.is_empty() {
        errors.push("service.name must not be empty".to_string());
    }

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(format!(
            "server.bind_address '{}' is not a valid socket address",
            config.server.bind_address
        ));
    }

    if !(0.0..=1.0).contains(&config.telemetry.sampling_ratio) {
        errors.push(format!(
            "telemetry.sampling_ratio {} must be between 0.0 and 1.0",
            config.telemetry.sampling_ratio
        ));
    }

    if !matches!(config.telemetry.log_format.as_str(), "json" | "pretty") {
        errors.push(format!(
            "telemetry.log_format '{}' must be 'json' or 'pretty'",
            config.telemetry.log_format
        ));
    }

    if config.telemetry.enabled && url::Url::parse(&config.telemetry.otlp_endpoint).is_err() {
        errors.push(format!(
            "telemetry.otlp_endpoint '{}' is not a valid URL",
            config.telemetry.otlp_endpoint
        ));
    }

    if url::Url::parse(&config.downstream.notifications_url).is_err() {
        errors.push(format!(
            "downstream.notifications_url '{}' is not a valid URL",
            config.downstream.notifications_url
        ));
    }

    if !(0.0..=1.0).contains(&config.simulation.failure_rate) {
        errors.push(format!(
            "simulation.failure_rate {} must be between 0.0 and 1.0",
            config.simulation.failure_rate
        ));
    }

    if config.simulation.delay_min_ms > config.simulation.delay_max_ms {
        errors.push(format!(
            "simulation.delay_min_ms {} exceeds delay_max_ms {}",
            config.simulation.delay_min_ms, config.simulation.delay_max_ms
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push("timeouts.request_secs must be greater than zero".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
