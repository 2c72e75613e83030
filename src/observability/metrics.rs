//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rpc_retries_total` (counter): retries by operation, reason (expired/transient)
//! - `rpc_session_renewals_total` (counter): forced logins by operation
//! - `rpc_calls_total` (counter): finished invokes by operation, outcome

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must run inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_retry(operation: &str, reason: &'static str) {
    counter!("rpc_retries_total", "operation" => operation.to_string(), "reason" => reason).increment(1);
}

pub fn record_session_renewal(operation: &str) {
    counter!("rpc_session_renewals_total", "operation" => operation.to_string()).increment(1);
}

pub fn record_call(operation: &str, outcome: &'static str) {
    counter!("rpc_calls_total", "operation" => operation.to_string(), "outcome" => outcome).increment(1);
}
