//! Metrics collection and Prometheus exporter for relayd.
//!
//! Provides metric instrumentation for the subscriber registry, the
//! traffic flush pipeline, and the relay lifecycle, plus a periodic
//! sampler that publishes registry gauges from the store.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

mod sampler;

pub use sampler::run_sampler;

/// Initialize Prometheus metrics exporter.
///
/// Starts an HTTP server on the given address to expose metrics.
/// Returns an error message if binding fails.
pub fn init_prometheus(listen: &str) -> Result<(), String> {
    let addr: SocketAddr = listen
        .parse()
        .map_err(|e| format!("invalid metrics listen address: {}", e))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install prometheus exporter: {}", e))?;

    Ok(())
}

// ============================================================================
// Metric Names
// ============================================================================

/// Total number of subscribers in the registry.
pub const SUBSCRIBERS_TOTAL: &str = "relayd_subscribers_total";
/// Number of active, non-expired subscribers.
pub const SUBSCRIBERS_ACTIVE: &str = "relayd_subscribers_active";
/// Number of subscribers with expired subscriptions.
pub const SUBSCRIBERS_EXPIRED: &str = "relayd_subscribers_expired";
/// Number of subscribers at or over their traffic limit.
pub const SUBSCRIBERS_OVER_LIMIT: &str = "relayd_subscribers_over_limit";
/// Per-subscriber traffic usage in bytes (labelled by direction).
pub const SUBSCRIBER_TRAFFIC_BYTES: &str = "relayd_subscriber_traffic_bytes";
/// Per-subscriber remaining traffic limit in bytes.
pub const SUBSCRIBER_LIMIT_REMAINING_BYTES: &str = "relayd_subscriber_limit_remaining_bytes";
/// Total number of traffic flush cycles performed.
pub const FLUSH_CYCLES_TOTAL: &str = "relayd_flush_cycles_total";
/// Total bytes committed to the ledger (labelled by direction).
pub const FLUSHED_BYTES_TOTAL: &str = "relayd_flushed_bytes_total";
/// Total flush entries dropped (unresolvable correlation key).
pub const FLUSH_DROPPED_TOTAL: &str = "relayd_flush_dropped_total";
/// Whether the relay instance is running (1) or stopped (0).
pub const RELAY_RUNNING: &str = "relayd_relay_running";
/// Total number of relay restarts.
pub const RELAY_RESTARTS_TOTAL: &str = "relayd_relay_restarts_total";
/// Total number of errors by type.
pub const ERRORS_TOTAL: &str = "relayd_errors_total";

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record a completed flush cycle.
#[inline]
pub fn record_flush_cycle() {
    counter!(FLUSH_CYCLES_TOTAL).increment(1);
}

/// Record bytes committed to the ledger ("upload" or "download").
#[inline]
pub fn record_flushed_bytes(direction: &'static str, bytes: u64) {
    counter!(FLUSHED_BYTES_TOTAL, "direction" => direction).increment(bytes);
}

/// Record a flush entry dropped because its key did not resolve.
#[inline]
pub fn record_flush_dropped() {
    counter!(FLUSH_DROPPED_TOTAL).increment(1);
}

/// Set the relay running gauge.
#[inline]
pub fn set_relay_running(running: bool) {
    gauge!(RELAY_RUNNING).set(if running { 1.0 } else { 0.0 });
}

/// Record a relay restart.
#[inline]
pub fn record_relay_restart() {
    counter!(RELAY_RESTARTS_TOTAL).increment(1);
}

/// Record an error by type.
#[inline]
pub fn record_error(error_type: &'static str) {
    counter!(ERRORS_TOTAL, "type" => error_type).increment(1);
}

/// Set registry count gauges.
#[inline]
pub fn set_subscriber_counts(total: i64, active: i64, expired: i64, over_limit: i64) {
    gauge!(SUBSCRIBERS_TOTAL).set(total as f64);
    gauge!(SUBSCRIBERS_ACTIVE).set(active as f64);
    gauge!(SUBSCRIBERS_EXPIRED).set(expired as f64);
    gauge!(SUBSCRIBERS_OVER_LIMIT).set(over_limit as f64);
}

/// Set a per-subscriber traffic gauge.
/// Note: allocates a String for the username label; the sampler calls
/// this at a low rate only.
#[inline]
pub fn set_subscriber_traffic(username: &str, direction: &'static str, bytes: i64) {
    gauge!(SUBSCRIBER_TRAFFIC_BYTES, "username" => username.to_owned(), "direction" => direction)
        .set(bytes as f64);
}

/// Set a per-subscriber remaining-limit gauge.
#[inline]
pub fn set_subscriber_limit_remaining(username: &str, bytes: i64) {
    gauge!(SUBSCRIBER_LIMIT_REMAINING_BYTES, "username" => username.to_owned()).set(bytes as f64);
}

// ============================================================================
// Error Type Constants (re-exported from relayd-core)
// ============================================================================

pub use relayd_core::{
    ERROR_CONFIG, ERROR_CONTROL, ERROR_IO, ERROR_PARSE, ERROR_STORE, ERROR_TIMEOUT,
};
