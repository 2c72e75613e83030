//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! Credential (username, password from environment)
//!     → stub::login (login strategy performs the handshake)
//!     → LoginResult (server URL, session id)
//!     → Session::establish (stores endpoint + token + timestamp)
//!     → net::Connection built from the Session
//! ```
//!
//! # Design Decisions
//! - A Session is owned by exactly one stub; nothing else mutates it
//! - The remote side may invalidate a session at any time; we only learn
//!   about it when a call fails
//! - Secrets never appear in Debug output

pub mod credential;
pub mod types;

pub use credential::Credential;
pub use types::{LoginResult, Session, SessionError, SessionType};
