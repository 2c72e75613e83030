//! Errors surfaced by the recoverable-call executor.

use thiserror::Error;

use crate::net::RemoteFault;
use crate::resilience::registry::RegistryError;
use crate::stub::StubError;

/// The single error type returned by [`RecoverableCall::invoke`](crate::resilience::RecoverableCall::invoke).
///
/// Every variant names the operation that failed.
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// Retryable failures kept occurring until the retry budget ran out.
    #[error("All retry attempts failed to execute {operation} after {attempts} retries")]
    Exhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: RemoteFault,
    },

    /// The classifier rejected the failure; only one attempt was made.
    #[error("Unknown failure occurred for {operation}")]
    NonRetryable {
        operation: String,
        #[source]
        source: RemoteFault,
    },

    /// Preparing or renewing the session failed.
    #[error("Session preparation failed for {operation}")]
    Session {
        operation: String,
        #[source]
        source: StubError,
    },

    /// No classifier could be resolved for the stub's session type.
    #[error("Cannot classify failures of {operation}")]
    Classifier {
        operation: String,
        #[source]
        source: RegistryError,
    },

    /// Shutdown was signalled while waiting between attempts.
    #[error("{operation} cancelled after {attempts} retries")]
    Cancelled { operation: String, attempts: u32 },
}

impl RecoveryError {
    /// Name of the operation that failed.
    pub fn operation(&self) -> &str {
        match self {
            RecoveryError::Exhausted { operation, .. }
            | RecoveryError::NonRetryable { operation, .. }
            | RecoveryError::Session { operation, .. }
            | RecoveryError::Classifier { operation, .. }
            | RecoveryError::Cancelled { operation, .. } => operation,
        }
    }

    /// The remote failure that ended the call, if one did.
    pub fn fault(&self) -> Option<&RemoteFault> {
        match self {
            RecoveryError::Exhausted { source, .. } | RecoveryError::NonRetryable { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RecoveryError::Exhausted { .. })
    }

    pub fn is_non_retryable(&self) -> bool {
        matches!(self, RecoveryError::NonRetryable { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RecoveryError::Cancelled { .. })
    }

    /// Label used for the call outcome metric.
    pub(crate) fn outcome(&self) -> &'static str {
        match self {
            RecoveryError::Exhausted { .. } => "exhausted",
            RecoveryError::NonRetryable { .. } => "non_retryable",
            RecoveryError::Session { .. } => "session",
            RecoveryError::Classifier { .. } => "classifier",
            RecoveryError::Cancelled { .. } => "cancelled",
        }
    }
}

/// Result type for recoverable calls.
pub type RecoveryResult<T> = Result<T, RecoveryError>;
