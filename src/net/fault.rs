//! Failures raised by remote operation bodies.

use thiserror::Error;

/// Coarse category of a transport-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Could not establish a TCP/TLS connection.
    Connect,
    /// Request did not complete within the transport timeout.
    Timeout,
    /// Anything else the HTTP client reported.
    Other,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Connect => f.write_str("connect"),
            TransportKind::Timeout => f.write_str("timeout"),
            TransportKind::Other => f.write_str("other"),
        }
    }
}

/// A failed remote call, as seen by failure classifiers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteFault {
    /// The server answered with a declared fault. `status` is kept when the
    /// envelope arrived on a non-success HTTP response.
    #[error("Remote fault {code}: {message}")]
    Fault {
        code: String,
        message: String,
        status: Option<u16>,
    },

    /// Non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The request never produced a response.
    #[error("Transport error ({kind}): {message}")]
    Transport { kind: TransportKind, message: String },

    /// The response could not be understood.
    #[error("Malformed response: {0}")]
    Decode(String),

    /// An operation ran before the stub had a connection.
    #[error("Stub has no prepared connection")]
    NotPrepared,
}

impl RemoteFault {
    pub fn fault(code: impl Into<String>, message: impl Into<String>) -> Self {
        RemoteFault::Fault {
            code: code.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Attach the HTTP status a declared fault arrived with.
    pub fn with_status(self, status: u16) -> Self {
        match self {
            RemoteFault::Fault { code, message, .. } => RemoteFault::Fault {
                code,
                message,
                status: Some(status),
            },
            other => other,
        }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        RemoteFault::Http {
            status,
            message: message.into(),
        }
    }

    pub fn transport(kind: TransportKind, message: impl Into<String>) -> Self {
        RemoteFault::Transport {
            kind,
            message: message.into(),
        }
    }

    /// Server-declared fault code, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            RemoteFault::Fault { code, .. } => Some(code),
            _ => None,
        }
    }

    /// HTTP status, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteFault::Http { status, .. } => Some(*status),
            RemoteFault::Fault { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RemoteFault {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return RemoteFault::Decode(err.to_string());
        }
        let kind = if err.is_timeout() {
            TransportKind::Timeout
        } else if err.is_connect() {
            TransportKind::Connect
        } else {
            TransportKind::Other
        };
        RemoteFault::transport(kind, err.to_string())
    }
}

impl From<serde_json::Error> for RemoteFault {
    fn from(err: serde_json::Error) -> Self {
        RemoteFault::Decode(err.to_string())
    }
}
