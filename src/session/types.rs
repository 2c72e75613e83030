//! Session state and session-type tags.

use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::resilience::registry::RegistryError;

/// Backend family a session belongs to.
///
/// Each family signals expiry and transient failures differently, so the
/// tag selects the failure classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Enterprise,
    Partner,
    Rest,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Enterprise => "enterprise",
            SessionType::Partner => "partner",
            SessionType::Rest => "rest",
        }
    }
}

impl std::fmt::Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionType {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "enterprise" => Ok(SessionType::Enterprise),
            "partner" => Ok(SessionType::Partner),
            "rest" => Ok(SessionType::Rest),
            _ => Err(RegistryError::UnknownSessionType(s.to_string())),
        }
    }
}

/// Result of a successful login handshake.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    /// Service endpoint that subsequent calls must target.
    pub server_url: String,
    /// Session token.
    pub session_id: String,
    /// Remote identifier of the logged-in principal, if reported.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Errors raised while storing a login result into a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid server URL '{url}': {source}")]
    InvalidServerUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Login returned an empty session id")]
    EmptySessionId,
}

/// Authenticated connection state for one identity.
#[derive(Clone)]
pub struct Session {
    session_type: SessionType,
    server_url: Option<Url>,
    session_id: Option<String>,
    login_result: Option<LoginResult>,
    established_at: Option<SystemTime>,
}

impl Session {
    /// Create an empty, not yet established session.
    pub fn new(session_type: SessionType) -> Self {
        Self {
            session_type,
            server_url: None,
            session_id: None,
            login_result: None,
            established_at: None,
        }
    }

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    pub fn server_url(&self) -> Option<&Url> {
        self.server_url.as_ref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn login_result(&self) -> Option<&LoginResult> {
        self.login_result.as_ref()
    }

    /// When the current token was obtained.
    pub fn established_at(&self) -> Option<SystemTime> {
        self.established_at
    }

    pub fn is_established(&self) -> bool {
        self.server_url.is_some() && self.session_id.is_some()
    }

    /// Replace the session state with a fresh login result.
    ///
    /// On error the previous state is left untouched.
    pub fn establish(&mut self, result: LoginResult) -> Result<(), SessionError> {
        if result.session_id.is_empty() {
            return Err(SessionError::EmptySessionId);
        }
        let server_url = Url::parse(&result.server_url).map_err(|source| SessionError::InvalidServerUrl {
            url: result.server_url.clone(),
            source,
        })?;

        self.server_url = Some(server_url);
        self.session_id = Some(result.session_id.clone());
        self.login_result = Some(result);
        self.established_at = Some(SystemTime::now());
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_type", &self.session_type)
            .field("server_url", &self.server_url.as_ref().map(Url::as_str))
            .field("has_token", &self.session_id.is_some())
            .field("established_at", &self.established_at)
            .finish()
    }
}
