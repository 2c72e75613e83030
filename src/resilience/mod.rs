//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! RecoverableCall::invoke(stub)
//!     → run operation body against the stub
//!     → On failure: registry.rs resolves a classifier (once per invoke)
//!     → classifier.rs: retryable? expired?
//!         expired   → stub.prepare(force_new = true), retry at once
//!         transient → backoff.rs delay, retry
//!         otherwise → NonRetryable error
//!     → retry budget spent → Exhausted error carrying the last failure
//! ```
//!
//! # Design Decisions
//! - One wrapping error type; variants tell exhausted from non-retryable
//! - Linear backoff (base * (1 + attempt)), no jitter
//! - Renewal failures are not retried by this layer
//! - Shutdown during a backoff wait cancels the whole call

pub mod backoff;
pub mod classifier;
pub mod registry;
pub mod retries;
pub mod types;

pub use classifier::{FailureClassifier, FaultCodeClassifier, HttpStatusClassifier};
pub use registry::{ClassifierRegistry, RegistryError};
pub use retries::RecoverableCall;
pub use types::{RecoveryError, RecoveryResult};
