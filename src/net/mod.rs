//! Backend connection layer.
//!
//! # Data Flow
//! ```text
//! Established Session (endpoint + token)
//!     → ConnectorConfig (manual login, endpoint, session id, timeout)
//!     → connection.rs (JSON-RPC over HTTP, bearer session token)
//!     → Remote result, or fault.rs (RemoteFault) on any failure
//! ```
//!
//! # Design Decisions
//! - Manual login only: the connection never sends raw credentials, it
//!   carries the token of an already established Session
//! - Every failure surfaces as a RemoteFault so classifiers see one shape
//! - Request timeouts belong to the transport; the retry layer adds none

pub mod connection;
pub mod fault;

pub use connection::{Connection, ConnectionError, ConnectionId, ConnectorConfig};
pub use fault::{RemoteFault, TransportKind};
