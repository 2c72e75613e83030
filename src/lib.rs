//! Session-aware recoverable remote calls.
//!
//! Wraps remote operations against a session-authenticated endpoint with
//! classified retries, linear backoff and transparent session renewal.

pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod session;
pub mod stub;

pub use config::schema::ClientConfig;
pub use lifecycle::Shutdown;
pub use net::RemoteFault;
pub use resilience::{RecoverableCall, RecoveryError, RecoveryResult};
pub use session::{Credential, Session, SessionType};
pub use stub::{ServiceStub, Stub};
