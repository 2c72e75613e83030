//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, bounded retries and delays)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ClientConfig;

/// Upper bound on the retry budget.
pub const MAX_RETRIES_LIMIT: u32 = 100;

/// Upper bound on the backoff unit (10 minutes).
pub const MAX_BASE_DELAY_MS: u64 = 600_000;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a parsed configuration.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.credential.username.trim().is_empty() {
        errors.push(ValidationError::new("credential.username", "must not be empty"));
    }
    if config.credential.password_env.trim().is_empty() {
        errors.push(ValidationError::new("credential.password_env", "must name an environment variable"));
    }

    match &config.endpoint.login_url {
        None => errors.push(ValidationError::new("endpoint.login_url", "is required")),
        Some(url) if !matches!(url.scheme(), "http" | "https") => errors.push(ValidationError::new(
            "endpoint.login_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Some(_) => {}
    }

    if config.endpoint.request_timeout_secs == 0 {
        errors.push(ValidationError::new("endpoint.request_timeout_secs", "must be greater than 0"));
    }

    if config.recovery.max_retries > MAX_RETRIES_LIMIT {
        errors.push(ValidationError::new(
            "recovery.max_retries",
            format!("must be at most {}", MAX_RETRIES_LIMIT),
        ));
    }
    if config.recovery.base_delay_ms > MAX_BASE_DELAY_MS {
        errors.push(ValidationError::new(
            "recovery.base_delay_ms",
            format!("must be at most {}", MAX_BASE_DELAY_MS),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
