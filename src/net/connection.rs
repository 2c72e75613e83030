//! Backend connection handle.
//!
//! # Responsibilities
//! - Bind an HTTP client to one service endpoint and one session token
//! - Encode JSON-RPC requests and decode results or faults
//! - Tag each rebuilt connection with a unique ID for tracing

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::net::fault::RemoteFault;

/// Global atomic counter for connection IDs.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Settings used to build a [`Connection`].
#[derive(Clone, Default)]
pub struct ConnectorConfig {
    /// Authentication is handled by an established session, not by the connection.
    pub manual_login: bool,
    pub service_endpoint: Option<Url>,
    pub session_id: Option<String>,
    /// Per-request timeout. `None` leaves the client default.
    pub timeout: Option<Duration>,
}

/// Errors building a connection handle.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Embedded login is not supported; manual login must be enabled")]
    EmbeddedLogin,

    #[error("No service endpoint configured")]
    MissingEndpoint,

    #[error("No session id configured")]
    MissingSessionId,

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: serde_json::Value,
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: Uuid,
    method: &'a str,
    params: P,
}

/// Longest response excerpt carried inside an HTTP fault.
const MAX_FAULT_BODY: usize = 512;

/// JSON-RPC connection bound to one endpoint and session token.
#[derive(Clone)]
pub struct Connection {
    id: ConnectionId,
    client: reqwest::Client,
    endpoint: Url,
    session_id: String,
}

impl Connection {
    /// Build a connection from an established session's endpoint and token.
    pub fn new(config: ConnectorConfig) -> Result<Self, ConnectionError> {
        if !config.manual_login {
            return Err(ConnectionError::EmbeddedLogin);
        }
        let endpoint = config.service_endpoint.ok_or(ConnectionError::MissingEndpoint)?;
        let session_id = config
            .session_id
            .filter(|s| !s.is_empty())
            .ok_or(ConnectionError::MissingSessionId)?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            id: ConnectionId::new(),
            client,
            endpoint,
            session_id,
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Invoke a remote method and decode its result.
    pub async fn call<P, T>(&self, method: &str, params: P) -> Result<T, RemoteFault>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: Uuid::new_v4(),
            method,
            params,
        };
        tracing::debug!(connection = %self.id, request_id = %request.id, method, "Sending remote call");

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.session_id)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        decode_response(status.as_u16(), &text)
    }
}

fn decode_response<T: DeserializeOwned>(status: u16, text: &str) -> Result<T, RemoteFault> {
    let (result, error) = match serde_json::from_str::<RpcEnvelope>(text) {
        Ok(envelope) => (envelope.result, envelope.error),
        Err(_) => (None, None),
    };

    let success = (200..300).contains(&status);

    // A declared fault wins over the HTTP status but keeps it for status-based classifiers.
    if let Some(err) = error {
        let code = match err.code {
            serde_json::Value::String(code) => code,
            other => other.to_string(),
        };
        return Err(RemoteFault::Fault {
            code,
            message: err.message,
            status: (!success).then_some(status),
        });
    }

    if !success {
        let mut message = text.to_string();
        if message.len() > MAX_FAULT_BODY {
            let mut end = MAX_FAULT_BODY;
            while !message.is_char_boundary(end) {
                end -= 1;
            }
            message.truncate(end);
        }
        return Err(RemoteFault::http(status, message));
    }

    match result {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Err(RemoteFault::Decode(
            "response carried neither result nor error".to_string(),
        )),
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}
