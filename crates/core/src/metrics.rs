//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Intake (submissions, rejections, expiry, clears)
//! - Resource handles held for live payloads
//! - Analysis requests and classifier latency

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Intake
// =============================================================================

/// Files admitted to the intake queue.
pub static FILES_SUBMITTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "printdrop_files_submitted_total",
        "Total files admitted to the intake queue",
    )
    .unwrap()
});

/// Files named in a rejected (oversized) batch.
pub static FILES_REJECTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "printdrop_files_rejected_total",
        "Total files rejected for exceeding the size limit",
    )
    .unwrap()
});

/// Open selections dropped by the retention sweep without being sent.
pub static SELECTIONS_EXPIRED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "printdrop_selections_expired_total",
        "Total abandoned selections dropped by the retention sweep",
    )
    .unwrap()
});

/// Files evicted by the retention sweep.
pub static FILES_EXPIRED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "printdrop_files_expired_total",
        "Total files evicted after the retention window",
    )
    .unwrap()
});

/// Files removed by an owner clear.
pub static FILES_CLEARED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "printdrop_files_cleared_total",
        "Total files removed by clearing the queue",
    )
    .unwrap()
});

// =============================================================================
// Resources
// =============================================================================

/// Resource handles currently acquired and not yet released.
pub static RESOURCE_HANDLES_LIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "printdrop_resource_handles_live",
        "Payload resource handles currently held",
    )
    .unwrap()
});

// =============================================================================
// Analysis
// =============================================================================

/// Analysis outcomes by result.
pub static ANALYSIS_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "printdrop_analysis_requests_total",
            "Total analysis requests by outcome",
        ),
        &["result"], // "started", "success", "error", "discarded"
    )
    .unwrap()
});

/// Classifier call duration in seconds.
pub static ANALYSIS_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "printdrop_analysis_duration_seconds",
            "Duration of classifier calls",
        )
        .buckets(vec![0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Intake
        Box::new(FILES_SUBMITTED_TOTAL.clone()),
        Box::new(FILES_REJECTED_TOTAL.clone()),
        Box::new(FILES_EXPIRED_TOTAL.clone()),
        Box::new(FILES_CLEARED_TOTAL.clone()),
        Box::new(SELECTIONS_EXPIRED_TOTAL.clone()),
        // Resources
        Box::new(RESOURCE_HANDLES_LIVE.clone()),
        // Analysis
        Box::new(ANALYSIS_REQUESTS.clone()),
        Box::new(ANALYSIS_DURATION.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register_cleanly() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        // label vectors without observations are not gathered
        assert!(registry.gather().len() >= 6);
    }
}
