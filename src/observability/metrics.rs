//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by admission outcome and status
//! - `gateway_request_duration_seconds` (histogram): latency by outcome
//! - `gateway_ticket_validations_total` (counter): CAS validations by result
//! - `gateway_backend_responses_total` (counter): backend responses by status
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(outcome: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_ticket_validation(result: &'static str) {
    metrics::counter!("gateway_ticket_validations_total", "result" => result).increment(1);
}

pub fn record_backend_response(status: u16) {
    metrics::counter!("gateway_backend_responses_total", "status" => status.to_string())
        .increment(1);
}
