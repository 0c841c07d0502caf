//! # Metrics
//!
//! Prometheus metrics for monitoring the sync job.
//!
//! ## Metrics Exposed
//!
//! - `frontdoor_cert_sync_runs_total` - Total number of sync runs
//! - `frontdoor_cert_sync_run_errors_total` - Total number of failed sync runs
//! - `frontdoor_cert_sync_run_duration_seconds` - Duration of sync runs
//! - `frontdoor_cert_sync_last_success_timestamp_seconds` - Unix time of the last successful run
//! - `frontdoor_cert_sync_endpoints_scanned_total` - Frontend endpoints inspected
//! - `frontdoor_cert_sync_endpoints_skipped_total` - Endpoints not sourced from Key Vault
//! - `frontdoor_cert_sync_endpoints_up_to_date_total` - Endpoints already on the latest version
//! - `frontdoor_cert_sync_certificate_updates_total` - Certificate updates by result
//! - `frontdoor_cert_sync_provider_operations_total` - Azure API operations by provider and operation
//! - `frontdoor_cert_sync_provider_operation_duration_seconds` - Duration of Azure API operations
//! - `frontdoor_cert_sync_provider_operation_errors_total` - Failed Azure API operations

use anyhow::Result;
use prometheus::{Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RUNS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("frontdoor_cert_sync_runs_total", "Total number of sync runs")
        .expect("Failed to create RUNS_TOTAL metric - this should never happen")
});

static RUN_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "frontdoor_cert_sync_run_errors_total",
        "Total number of failed sync runs",
    )
    .expect("Failed to create RUN_ERRORS_TOTAL metric - this should never happen")
});

static RUN_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "frontdoor_cert_sync_run_duration_seconds",
            "Duration of sync runs in seconds",
        )
        .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0]),
    )
    .expect("Failed to create RUN_DURATION metric - this should never happen")
});

static LAST_SUCCESS_TIMESTAMP: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "frontdoor_cert_sync_last_success_timestamp_seconds",
        "Unix timestamp of the last successful sync run",
    )
    .expect("Failed to create LAST_SUCCESS_TIMESTAMP metric - this should never happen")
});

static ENDPOINTS_SCANNED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "frontdoor_cert_sync_endpoints_scanned_total",
        "Total number of frontend endpoints inspected",
    )
    .expect("Failed to create ENDPOINTS_SCANNED_TOTAL metric - this should never happen")
});

static ENDPOINTS_SKIPPED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "frontdoor_cert_sync_endpoints_skipped_total",
        "Total number of frontend endpoints without a Key Vault certificate",
    )
    .expect("Failed to create ENDPOINTS_SKIPPED_TOTAL metric - this should never happen")
});

static ENDPOINTS_UP_TO_DATE_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "frontdoor_cert_sync_endpoints_up_to_date_total",
        "Total number of frontend endpoints already on the latest certificate version",
    )
    .expect("Failed to create ENDPOINTS_UP_TO_DATE_TOTAL metric - this should never happen")
});

static CERTIFICATE_UPDATES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "frontdoor_cert_sync_certificate_updates_total",
            "Total number of certificate updates by result",
        ),
        &["result"],
    )
    .expect("Failed to create CERTIFICATE_UPDATES_TOTAL metric - this should never happen")
});

// Provider-specific metrics with provider and operation labels
static PROVIDER_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "frontdoor_cert_sync_provider_operations_total",
            "Total number of provider operations by provider and operation",
        ),
        &["provider", "operation"],
    )
    .expect("Failed to create PROVIDER_OPERATIONS_TOTAL metric - this should never happen")
});

static PROVIDER_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "frontdoor_cert_sync_provider_operation_duration_seconds",
            "Duration of provider operations in seconds by provider and operation",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 60.0, 300.0]),
        &["provider", "operation"],
    )
    .expect("Failed to create PROVIDER_OPERATION_DURATION metric - this should never happen")
});

static PROVIDER_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "frontdoor_cert_sync_provider_operation_errors_total",
            "Total number of provider operation errors by provider and operation",
        ),
        &["provider", "operation"],
    )
    .expect("Failed to create PROVIDER_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

/// Register all metrics with the shared registry
///
/// # Errors
/// Returns an error if a metric is registered twice
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RUNS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RUN_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RUN_DURATION.clone()))?;
    REGISTRY.register(Box::new(LAST_SUCCESS_TIMESTAMP.clone()))?;
    REGISTRY.register(Box::new(ENDPOINTS_SCANNED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ENDPOINTS_SKIPPED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ENDPOINTS_UP_TO_DATE_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CERTIFICATE_UPDATES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PROVIDER_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PROVIDER_OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(PROVIDER_OPERATION_ERRORS_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_runs() {
    RUNS_TOTAL.inc();
}

pub fn increment_run_errors() {
    RUN_ERRORS_TOTAL.inc();
}

pub fn observe_run_duration(duration: f64) {
    RUN_DURATION.observe(duration);
}

pub fn set_last_success_timestamp(unix_seconds: i64) {
    LAST_SUCCESS_TIMESTAMP.set(unix_seconds);
}

pub fn increment_endpoints_scanned() {
    ENDPOINTS_SCANNED_TOTAL.inc();
}

pub fn increment_endpoints_skipped() {
    ENDPOINTS_SKIPPED_TOTAL.inc();
}

pub fn increment_endpoints_up_to_date() {
    ENDPOINTS_UP_TO_DATE_TOTAL.inc();
}

/// Count a finished certificate update; `result` is `updated` or `failed`
pub fn increment_certificate_updates(result: &str) {
    CERTIFICATE_UPDATES_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_provider_operation(provider: &str, operation: &str, duration: f64) {
    PROVIDER_OPERATIONS_TOTAL
        .with_label_values(&[provider, operation])
        .inc();
    PROVIDER_OPERATION_DURATION
        .with_label_values(&[provider, operation])
        .observe(duration);
}

/// Increment provider operation errors counter
pub fn increment_provider_operation_errors(provider: &str, operation: &str) {
    PROVIDER_OPERATION_ERRORS_TOTAL
        .with_label_values(&[provider, operation])
        .inc();
}

/// Current error count for one provider operation
#[must_use]
pub fn provider_operation_errors(provider: &str, operation: &str) -> u64 {
    PROVIDER_OPERATION_ERRORS_TOTAL
        .with_label_values(&[provider, operation])
        .get()
}
