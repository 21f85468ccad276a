//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Aggregation requests (outcome, duration, tickets returned)
//! - Zendesk API calls (by endpoint and result)
//! - Group name cache effectiveness

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Aggregation Metrics
// =============================================================================

/// Aggregation requests total by result.
pub static AGGREGATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("roundup_aggregations_total", "Total ticket aggregations"),
        &["result"], // "success", "invalid", "search_failed", "timed_out"
    )
    .unwrap()
});

/// Aggregation duration in seconds.
pub static AGGREGATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "roundup_aggregation_duration_seconds",
            "Duration of ticket aggregations",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["result"],
    )
    .unwrap()
});

/// Tickets returned per successful aggregation.
pub static TICKETS_RETURNED: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "roundup_tickets_returned",
            "Number of tickets returned per aggregation",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 1000.0]),
        &[],
    )
    .unwrap()
});

/// Raw tickets dropped by the office-code exact-match filter.
pub static TICKETS_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "roundup_tickets_rejected_total",
            "Search hits dropped by post-filtering",
        ),
        &["reason"], // "office_mismatch", "out_of_range", "duplicate"
    )
    .unwrap()
});

// =============================================================================
// Zendesk Metrics
// =============================================================================

/// Zendesk API requests by endpoint and result.
pub static ZENDESK_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("roundup_zendesk_requests_total", "Total Zendesk API requests"),
        &["endpoint", "result"], // endpoint: "search", "group"
    )
    .unwrap()
});

/// Zendesk API request duration in seconds.
pub static ZENDESK_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "roundup_zendesk_request_duration_seconds",
            "Duration of Zendesk API requests",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["endpoint"],
    )
    .unwrap()
});

/// Group name lookups by outcome.
pub static GROUP_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("roundup_group_lookups_total", "Group name resolutions"),
        &["outcome"], // "cache_hit", "fetched", "failed"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(AGGREGATIONS.clone()),
        Box::new(AGGREGATION_DURATION.clone()),
        Box::new(TICKETS_RETURNED.clone()),
        Box::new(TICKETS_REJECTED.clone()),
        Box::new(ZENDESK_REQUESTS.clone()),
        Box::new(ZENDESK_REQUEST_DURATION.clone()),
        Box::new(GROUP_LOOKUPS.clone()),
    ]
}
