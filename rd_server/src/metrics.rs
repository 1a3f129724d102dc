//! Prometheus metrics for bracket operations.
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter, so
//! handlers record unconditionally.
//!
//! ```rust,no_run
//! use rd_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::scores_submitted_total("organizer");
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
///
/// `path` should be the matched route template, not the raw URI.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Bracket Metrics
// ============================================================================

pub fn brackets_generated_total(format: &str) {
    metrics::counter!("brackets_generated_total", "format" => format.to_string()).increment(1);
}

/// Accepted score, labelled by who reported it (`organizer` or `player`)
pub fn scores_submitted_total(source: &str) {
    metrics::counter!("scores_submitted_total", "source" => source.to_string()).increment(1);
}

/// Score rejected by validation or state checks
pub fn scores_rejected_total(reason: &str) {
    metrics::counter!("scores_rejected_total", "reason" => reason.to_string()).increment(1);
}

pub fn advancements_total() {
    metrics::counter!("advancements_total").increment(1);
}

pub fn withdrawals_total() {
    metrics::counter!("withdrawals_total").increment(1);
}

/// Matches resolved as forfeits, including those cascaded by a withdrawal
pub fn forfeits_total(count: u64) {
    metrics::counter!("forfeits_total").increment(count);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_exporter() {
        http_requests_total("GET", "/health", 200);
        http_request_duration_ms("GET", "/health", 1.5);
        brackets_generated_total("knockout");
        scores_submitted_total("player");
        scores_rejected_total("validation");
        advancements_total();
        withdrawals_total();
        forfeits_total(3);
    }
}
