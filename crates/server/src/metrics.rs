//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the PrintDrop server:
//! - HTTP request metrics (latency, counts, errors)
//! - Authentication failures
//! - Queue size (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "printdrop_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("printdrop_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "printdrop_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Authentication failures.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "printdrop_auth_failures_total",
            "Total authentication failures",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Queue Metrics (collected dynamically)
// =============================================================================

/// Records currently in the intake queue.
pub static QUEUE_FILES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("printdrop_queue_files", "Files currently in the intake queue").unwrap()
});

/// Open customer selections.
pub static OPEN_SELECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "printdrop_open_selections",
        "Customer selections staged but not yet sent",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(AUTH_FAILURES_TOTAL.clone()))
        .unwrap();

    // Queue
    registry.register(Box::new(QUEUE_FILES.clone())).unwrap();
    registry.register(Box::new(OPEN_SELECTIONS.clone())).unwrap();

    // Core metrics (intake, resources, analysis)
    for metric in printdrop_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    QUEUE_FILES.set(state.queue().len().await as i64);
    OPEN_SELECTIONS.set(state.selections().len().await as i64);
}

static UUID_REGEX: Lazy<regex_lite::Regex> = Lazy::new(|| {
    regex_lite::Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    )
    .unwrap()
});

static NUMERIC_REGEX: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = UUID_REGEX.replace_all(path, "{id}");
    let result = NUMERIC_REGEX.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/v1/files/550e8400-e29b-41d4-a716-446655440000/content";
        assert_eq!(normalize_path(path), "/api/v1/files/{id}/content");
    }

    #[test]
    fn test_normalize_path_two_uuids() {
        let path = "/api/v1/selections/550e8400-e29b-41d4-a716-446655440000/files/6ba7b810-9dad-11d1-80b4-00c04fd430c8";
        assert_eq!(normalize_path(path), "/api/v1/selections/{id}/files/{id}");
    }

    #[test]
    fn test_normalize_path_numeric() {
        let path = "/api/v1/files/12345";
        assert_eq!(normalize_path(path), "/api/v1/files/{id}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        let path = "/api/v1/health";
        assert_eq!(normalize_path(path), "/api/v1/health");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("printdrop_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_core_metrics() {
        printdrop_core::metrics::FILES_SUBMITTED_TOTAL.inc_by(0);
        QUEUE_FILES.set(0);

        let output = encode_metrics();

        assert!(output.contains("printdrop_queue_files"));
        assert!(output.contains("printdrop_files_submitted_total"));
        assert!(output.contains("printdrop_resource_handles_live"));
    }
}
