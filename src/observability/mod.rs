//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Recoverable calls produce:
//!     → logging.rs (structured log events: retries, renewals, logins)
//!     → metrics.rs (retry, renewal and outcome counters)
//!
//! Consumers:
//!     → stderr (tracing-subscriber fmt layer)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Recording never influences control flow
//! - Metrics are no-ops until an exporter is installed
//! - Operation name is the main label everywhere

pub mod logging;
pub mod metrics;
