//! Failure classification per backend family.
//!
//! # Responsibilities
//! - Decide whether a failure means the session expired
//! - Decide whether a failure is transient and worth another attempt
//!
//! # Design Decisions
//! - Classifiers are pure and never panic
//! - Unknown failure shapes are not retryable (fail closed)
//! - Every expiry failure is also retryable

use crate::net::fault::{RemoteFault, TransportKind};

/// Answers the two questions the retry loop asks about a failure.
pub trait FailureClassifier: Send + Sync + std::fmt::Debug {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    /// True only when the backend signalled an invalid or expired session.
    fn is_expired(&self, fault: &RemoteFault) -> bool;

    /// True when the failure is transient for this backend.
    fn is_retryable(&self, fault: &RemoteFault) -> bool;
}

fn is_transient_transport(fault: &RemoteFault) -> bool {
    matches!(
        fault,
        RemoteFault::Transport {
            kind: TransportKind::Connect | TransportKind::Timeout,
            ..
        }
    )
}

fn is_gateway_status(status: u16) -> bool {
    matches!(status, 502..=504)
}

/// Classifier for backends that report failures as coded faults.
#[derive(Debug, Clone)]
pub struct FaultCodeClassifier {
    expired_codes: Vec<String>,
    transient_codes: Vec<String>,
}

impl FaultCodeClassifier {
    pub const INVALID_SESSION_ID: &'static str = "INVALID_SESSION_ID";

    pub fn new() -> Self {
        Self {
            expired_codes: vec![Self::INVALID_SESSION_ID.to_string()],
            transient_codes: ["SERVER_UNAVAILABLE", "UNABLE_TO_LOCK_ROW", "QUERY_TIMEOUT"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }

    /// Treat an additional fault code as transient.
    pub fn with_transient_code(mut self, code: impl Into<String>) -> Self {
        self.transient_codes.push(code.into());
        self
    }
}

impl Default for FaultCodeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl FailureClassifier for FaultCodeClassifier {
    fn name(&self) -> &'static str {
        "fault_code"
    }

    fn is_expired(&self, fault: &RemoteFault) -> bool {
        fault
            .code()
            .is_some_and(|code| self.expired_codes.iter().any(|c| c == code))
    }

    fn is_retryable(&self, fault: &RemoteFault) -> bool {
        if self.is_expired(fault) || is_transient_transport(fault) {
            return true;
        }
        if fault.status().is_some_and(is_gateway_status) {
            return true;
        }
        match fault {
            RemoteFault::Fault { code, .. } => self.transient_codes.iter().any(|c| c == code),
            _ => false,
        }
    }
}

/// Classifier for backends that signal failures through HTTP status codes.
#[derive(Debug, Clone, Default)]
pub struct HttpStatusClassifier;

impl HttpStatusClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl FailureClassifier for HttpStatusClassifier {
    fn name(&self) -> &'static str {
        "http_status"
    }

    fn is_expired(&self, fault: &RemoteFault) -> bool {
        fault.status() == Some(401)
    }

    fn is_retryable(&self, fault: &RemoteFault) -> bool {
        if self.is_expired(fault) || is_transient_transport(fault) {
            return true;
        }
        match fault.status() {
            Some(status) => status == 429 || is_gateway_status(status),
            None => false,
        }
    }
}
