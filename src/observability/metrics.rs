//! Metrics collection and exposition.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::BreakerState;

/// Initialize the Prometheus exporter on its own listener.
///
/// Every exported series carries the common `application` tag.
pub fn init_metrics(addr: SocketAddr, service_name: &str) {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("application", service_name)
        .install()
        .expect("failed to install Prometheus recorder");

    tracing::info!("Metrics server listening on http://{}", addr);
}

/// Record one completed request.
pub fn record_request(path: &str, method: &str, status: u16, duration: Duration) {
    let labels = [
        ("path", path.to_string()),
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];

    counter!("gateway_requests_total", &labels).increment(1);
    histogram!("gateway_request_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Record one rejected or failed request.
pub fn record_error(path: &str, method: &str, error_kind: &str) {
    let labels = [
        ("path", path.to_string()),
        ("method", method.to_string()),
        ("error_kind", error_kind.to_string()),
    ];

    counter!("gateway_request_errors_total", &labels).increment(1);
}

/// Export a breaker state change (0=Closed, 1=Open, 2=HalfOpen).
pub fn record_breaker_state(breaker: &str, state: BreakerState) {
    let value = match state {
        BreakerState::Closed => 0.0,
        BreakerState::Open => 1.0,
        BreakerState::HalfOpen => 2.0,
    };
    gauge!("gateway_circuit_breaker_state", "breaker" => breaker.to_string()).set(value);
}
