//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::session::SessionType;

/// Root configuration for the client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Identity used to log in.
    pub credential: CredentialConfig,

    /// Login endpoint and backend family.
    pub endpoint: EndpointConfig,

    /// Retry budget and backoff.
    pub recovery: RecoveryConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Login identity. The password itself lives in the environment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialConfig {
    pub username: String,

    /// Environment variable holding the password.
    pub password_env: String,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password_env: "RPC_PASSWORD".to_string(),
        }
    }
}

/// Endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// URL the login handshake is posted to. Required.
    pub login_url: Option<Url>,

    /// Backend family; selects the failure classifier.
    pub session_type: SessionType,

    /// Transport timeout per request in seconds.
    pub request_timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            login_url: None,
            session_type: SessionType::Enterprise,
            request_timeout_secs: 30,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Maximum retries per call (attempts = max_retries + 1).
    pub max_retries: u32,

    /// Backoff unit in milliseconds; retry k waits base * (1 + k).
    pub base_delay_ms: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 3000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
