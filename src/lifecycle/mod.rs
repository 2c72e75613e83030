//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGINT / Ctrl-C → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → every subscribed RecoverableCall
//!             → pending backoff wait aborts with RecoveryError::Cancelled
//! ```
//!
//! # Design Decisions
//! - Cancellation is cooperative: only backoff waits observe it
//! - In-flight remote calls and logins run to completion

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
