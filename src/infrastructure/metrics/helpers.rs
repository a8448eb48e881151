//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    BACKEND_ERRORS_TOTAL, BACKEND_OPERATION_LATENCY, LISTINGS_TOTAL, LISTINGS_TRUNCATED_TOTAL,
    LISTING_LATENCY, MANAGER_BYPASS_TOTAL, RESTRICTION_PARSE_FAILURES_TOTAL, SEARCHES_TOTAL,
    TEMPLATES_FILTERED_TOTAL, TEMPLATES_RETURNED,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording listing metrics
pub struct ListingMetrics;

impl ListingMetrics {
    /// Record a listing served under the pro tier
    pub fn record_pro_listing() {
        LISTINGS_TOTAL.with_label_values(&["pro"]).inc();
    }

    /// Record a listing served under the free tier
    pub fn record_free_listing() {
        LISTINGS_TOTAL.with_label_values(&["free"]).inc();
    }

    /// Record end-to-end listing latency
    pub fn record_latency(latency_secs: f64) {
        LISTING_LATENCY.observe(latency_secs);
    }

    /// Record how many templates a listing returned
    pub fn record_returned(count: usize) {
        TEMPLATES_RETURNED.observe(count as f64);
    }

    /// Record a listing truncated at the free-tier cap
    pub fn record_truncated() {
        LISTINGS_TRUNCATED_TOTAL.inc();
    }

    /// Record a listing that carried a search term
    pub fn record_search() {
        SEARCHES_TOTAL.inc();
    }
}

/// Helper struct for recording restriction filter metrics
pub struct FilterMetrics;

impl FilterMetrics {
    /// Record a template hidden by a cohort rule
    pub fn record_cohort_filtered() {
        TEMPLATES_FILTERED_TOTAL.with_label_values(&["cohort"]).inc();
    }

    /// Record a template hidden by a role rule
    pub fn record_role_filtered() {
        TEMPLATES_FILTERED_TOTAL.with_label_values(&["role"]).inc();
    }

    /// Record a template hidden by a category rule
    pub fn record_category_filtered() {
        TEMPLATES_FILTERED_TOTAL
            .with_label_values(&["category"])
            .inc();
    }

    /// Record a template hidden by a user rule
    pub fn record_user_filtered() {
        TEMPLATES_FILTERED_TOTAL.with_label_values(&["user"]).inc();
    }

    /// Record a restriction payload that failed to parse
    pub fn record_parse_failure() {
        RESTRICTION_PARSE_FAILURES_TOTAL.inc();
    }

    /// Record a listing where restrictions were bypassed for a manager
    pub fn record_manager_bypass() {
        MANAGER_BYPASS_TOTAL.inc();
    }
}

/// Helper struct for backend metrics
pub struct BackendMetrics;

impl BackendMetrics {
    /// Record backend operation latency
    pub fn record_latency(backend: &str, operation: &str, latency_secs: f64) {
        BACKEND_OPERATION_LATENCY
            .with_label_values(&[backend, operation])
            .observe(latency_secs);
    }

    /// Record backend error
    pub fn record_error(backend: &str, operation: &str) {
        BACKEND_ERRORS_TOTAL
            .with_label_values(&[backend, operation])
            .inc();
    }
}
