//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define mirror metrics (sessions, frames, connect failures, HTTP latency)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `mirror_ws_sessions_total` (counter): client WebSocket sessions accepted
//! - `mirror_ws_sessions_active` (gauge): client WebSocket sessions open now
//! - `mirror_ws_connect_failures_total` (counter): upstream dials failed, by reason
//! - `mirror_ws_frames_total` (counter): frames relayed, by direction
//! - `mirror_http_requests_total` (counter): mirrored HTTP requests by method, status
//! - `mirror_http_request_duration_seconds` (histogram): HTTP mirror latency
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup
//! - Exporter is opt-in; a dev tool should not grab a second port by default

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

pub const WS_SESSIONS_TOTAL: &str = "mirror_ws_sessions_total";
pub const WS_SESSIONS_ACTIVE: &str = "mirror_ws_sessions_active";
pub const WS_CONNECT_FAILURES_TOTAL: &str = "mirror_ws_connect_failures_total";
pub const WS_FRAMES_TOTAL: &str = "mirror_ws_frames_total";
pub const HTTP_REQUESTS_TOTAL: &str = "mirror_http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "mirror_http_request_duration_seconds";

/// `direction` label values for `mirror_ws_frames_total`.
pub const CLIENT_TO_UPSTREAM: &str = "client_to_upstream";
pub const UPSTREAM_TO_CLIENT: &str = "upstream_to_client";

/// Install the global Prometheus recorder and start its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_ws_session_opened() {
    counter!(WS_SESSIONS_TOTAL).increment(1);
    gauge!(WS_SESSIONS_ACTIVE).increment(1.0);
}

pub fn record_ws_session_closed() {
    gauge!(WS_SESSIONS_ACTIVE).decrement(1.0);
}

/// `reason` is one of `timeout`, `error`, `interrupted`.
pub fn record_connect_failure(reason: &'static str) {
    counter!(WS_CONNECT_FAILURES_TOTAL, "reason" => reason).increment(1);
}

pub fn record_frame(direction: &'static str) {
    counter!(WS_FRAMES_TOTAL, "direction" => direction).increment(1);
}

/// Record a completed mirrored HTTP request.
pub fn record_http_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "status" => status.clone()).increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "status" => status)
        .record(start.elapsed().as_secs_f64());
}
