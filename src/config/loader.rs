//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ClientConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::session::Credential;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("Environment variable {var} is not set")]
    MissingSecret { var: String },

    #[error("HTTP client error: {0}")]
    HttpClient(reqwest::Error),
}

impl ConfigError {
    pub(crate) fn missing_login_url() -> Self {
        ConfigError::Validation(vec![ValidationError::new("endpoint.login_url", "is required")])
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ClientConfig, ConfigError> {
    let config: ClientConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Build the login credential, reading the password from the environment.
pub fn load_credential(config: &ClientConfig) -> Result<Credential, ConfigError> {
    let var = &config.credential.password_env;
    Credential::from_env(config.credential.username.clone(), var)
        .map_err(|_| ConfigError::MissingSecret { var: var.clone() })
}
