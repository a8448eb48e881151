//! Prometheus metrics for the template catalog service.
//!
//! This module provides metrics for monitoring the catalog:
//! - Listing metrics (requests by tier, latency, result sizes)
//! - Filter metrics (templates hidden per rule, malformed restriction payloads)
//! - Backend metrics (store operation latency and errors)
//! - HTTP API metrics

mod helpers;

pub use helpers::{encode_metrics, BackendMetrics, FilterMetrics, ListingMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    Histogram, HistogramVec, IntCounter, IntCounterVec,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "ara_catalog";

lazy_static! {
    // ============================================================================
    // Listing Metrics
    // ============================================================================

    /// Total listing requests by entitlement tier
    pub static ref LISTINGS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_listings_total", METRIC_PREFIX),
        "Total template listing requests",
        &["tier"]
    ).unwrap();

    /// End-to-end listing latency
    pub static ref LISTING_LATENCY: Histogram = register_histogram!(
        format!("{}_listing_latency_seconds", METRIC_PREFIX),
        "Template listing latency in seconds",
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    ).unwrap();

    /// Distribution of templates returned per listing
    pub static ref TEMPLATES_RETURNED: Histogram = register_histogram!(
        format!("{}_templates_returned", METRIC_PREFIX),
        "Number of templates returned per listing",
        vec![0.0, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0]
    ).unwrap();

    /// Listings cut short by the free-tier result cap
    pub static ref LISTINGS_TRUNCATED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_listings_truncated_total", METRIC_PREFIX),
        "Total listings truncated at the free-tier result cap"
    ).unwrap();

    /// Listing requests carrying a search term
    pub static ref SEARCHES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_searches_total", METRIC_PREFIX),
        "Total listing requests with a search term"
    ).unwrap();

    // ============================================================================
    // Filter Metrics
    // ============================================================================

    /// Templates hidden from a listing, by the rule that excluded them
    pub static ref TEMPLATES_FILTERED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_templates_filtered_total", METRIC_PREFIX),
        "Total templates hidden by a restriction rule",
        &["rule"]
    ).unwrap();

    /// Restriction payloads that failed to parse and were treated as unrestricted
    pub static ref RESTRICTION_PARSE_FAILURES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_restriction_parse_failures_total", METRIC_PREFIX),
        "Total malformed restriction payloads treated as unrestricted"
    ).unwrap();

    /// Listings where restrictions were skipped for a managing user
    pub static ref MANAGER_BYPASS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_manager_bypass_total", METRIC_PREFIX),
        "Total listings where restriction checks were bypassed for a manager"
    ).unwrap();

    // ============================================================================
    // HTTP API Metrics
    // ============================================================================

    /// HTTP request counter by method and path
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_http_requests_total", METRIC_PREFIX),
        "Total HTTP requests",
        &["method", "path", "status"]
    ).unwrap();

    /// HTTP request latency
    pub static ref HTTP_REQUEST_LATENCY: HistogramVec = register_histogram_vec!(
        format!("{}_http_request_latency_seconds", METRIC_PREFIX),
        "HTTP request latency in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    ).unwrap();

    // ============================================================================
    // Backend Metrics
    // ============================================================================

    /// Backend operation latency
    pub static ref BACKEND_OPERATION_LATENCY: HistogramVec = register_histogram_vec!(
        format!("{}_backend_operation_latency_seconds", METRIC_PREFIX),
        "Backend operation latency in seconds",
        &["backend", "operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    ).unwrap();

    /// Backend operation errors
    pub static ref BACKEND_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_backend_errors_total", METRIC_PREFIX),
        "Total backend operation errors",
        &["backend", "operation"]
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics() {
        // Initialize some metrics first (lazy_static requires first access)
        LISTINGS_TOTAL.with_label_values(&["pro"]).inc();

        // Verify encoding doesn't panic and contains expected prefix
        let result = encode_metrics();
        assert!(result.is_ok());
        let output = result.unwrap();
        assert!(output.contains("ara_catalog_listings_total"));
    }

    #[test]
    fn test_listing_metrics() {
        LISTINGS_TOTAL.with_label_values(&["free"]).inc();
        LISTING_LATENCY.observe(0.01);
        TEMPLATES_RETURNED.observe(4.0);
        LISTINGS_TRUNCATED_TOTAL.inc();
        SEARCHES_TOTAL.inc();
        // Just verify no panics
    }

    #[test]
    fn test_filter_metrics() {
        TEMPLATES_FILTERED_TOTAL.with_label_values(&["cohort"]).inc();
        RESTRICTION_PARSE_FAILURES_TOTAL.inc();
        MANAGER_BYPASS_TOTAL.inc();
        // Just verify no panics
    }
}
