//! Stub subsystem.
//!
//! # Data Flow
//! ```text
//! Credential + LoginStrategy
//!     → Stub::prepare(force_new)
//!         → login.rs (handshake → LoginResult)
//!         → Session::establish
//!         → net::Connection rebuilt from the Session (manual login)
//!     → service.rs remote operations, each one RecoverableCall
//! ```
//!
//! # Design Decisions
//! - A stub exclusively owns its Session and connection handle
//! - The executor only calls `prepare`, never touches Session fields
//! - One stub serves one logical caller at a time; renewal is not
//!   synchronized across concurrent invokes

use std::future::Future;

use crate::session::Session;

pub mod login;
pub mod service;
pub mod types;

pub use login::{HttpLogin, LoginError, LoginStrategy};
pub use service::ServiceStub;
pub use types::{ApiError, DeleteResult, QueryResult, SObject, SaveResult, StubError};

/// A session-bound client the recoverable-call executor can drive.
pub trait Stub: Send + Sync {
    /// Current session; its type selects the failure classifier.
    fn session(&self) -> &Session;

    /// (Re)establish the session and connection handle.
    ///
    /// With `force_new` the stub always logs in again. Without it, an
    /// already prepared stub is left untouched.
    fn prepare(&mut self, force_new: bool) -> impl Future<Output = Result<(), StubError>> + Send;
}
