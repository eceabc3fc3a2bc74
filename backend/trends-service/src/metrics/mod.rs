//! Trends Metrics
//!
//! Prometheus metrics for the refresh and review cycle

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::time::Duration;

static REFRESH_RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "trends_refresh_runs_total",
        "Total trending refresh cycles (success/error)",
        &["status"]
    )
    .expect("Failed to register trends refresh runs metric")
});

static REFRESH_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "trends_refresh_duration_seconds",
        "Duration of trending refresh cycles",
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("Failed to register trends refresh duration metric")
});

static RECORDS_UPSERTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "trends_records_upserted_total",
        "Trend records written by refresh cycles"
    )
    .expect("Failed to register trends upserted metric")
});

static RECORDS_PRUNED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "trends_records_pruned_total",
        "Trend records removed after decaying below the threshold"
    )
    .expect("Failed to register trends pruned metric")
});

static TRACKED_RECORDS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "trends_tracked_records",
        "Trend records present after the last refresh"
    )
    .expect("Failed to register trends tracked records metric")
});

static REVIEW_REQUESTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "trends_review_requests_total",
        "Posts escalated for moderator review"
    )
    .expect("Failed to register trends review requests metric")
});

/// Record refresh run result (success/error)
pub fn record_refresh_run(status: &str) {
    REFRESH_RUNS_TOTAL.with_label_values(&[status]).inc();
}

pub fn record_refresh_duration(duration: Duration) {
    REFRESH_DURATION_SECONDS.observe(duration.as_secs_f64());
}

pub fn record_batch(upserted: u64, pruned: u64) {
    RECORDS_UPSERTED_TOTAL.inc_by(upserted);
    RECORDS_PRUNED_TOTAL.inc_by(pruned);
}

pub fn set_tracked_records(count: i64) {
    TRACKED_RECORDS.set(count);
}

pub fn record_review_requests(count: u64) {
    REVIEW_REQUESTS_TOTAL.inc_by(count);
}
