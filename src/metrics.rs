// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the hostname reconciliation engine.
//!
//! All metrics carry the `hostwarden_` prefix and live in [`METRICS_REGISTRY`].
//! The binary prints them in text format with `--print-metrics`.
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Outcome and duration per lifecycle state
//! - **Change Metrics** - Submitted record changes, sync timeouts and pruned records
//! - **Error Metrics** - Failures by error reason
//!
//! # Example
//!
//! ```rust,no_run
//! use hostwarden::metrics::record_reconciliation;
//!
//! record_reconciliation("starting", "applied", std::time::Duration::from_secs(1));
//! ```

use prometheus::{
    Counter, CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all metrics
const METRICS_NAMESPACE: &str = "hostwarden";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by lifecycle state and outcome
///
/// Labels:
/// - `state`: Lifecycle state (`starting`, `stopped`, `terminating`)
/// - `outcome`: `applied`, `no_action` or `error`
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by lifecycle state and outcome",
    );
    let counter = CounterVec::new(opts, &["state", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliations in seconds, including synchronization polling
///
/// Labels:
/// - `state`: Lifecycle state
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by lifecycle state",
    )
    .buckets(vec![0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 90.0, 120.0]);
    let histogram = HistogramVec::new(opts, &["state"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Change Metrics
// ============================================================================

/// Total number of record changes submitted, by action
///
/// Labels:
/// - `action`: `CREATE`, `UPSERT` or `DELETE`
pub static CHANGES_SUBMITTED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_changes_submitted_total"),
        "Total number of record changes submitted by action",
    );
    let counter = CounterVec::new(opts, &["action"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Change batches accepted but not observed as synchronized in time
pub static SYNC_TIMEOUTS_TOTAL: LazyLock<Counter> = LazyLock::new(|| {
    let counter = Counter::new(
        format!("{METRICS_NAMESPACE}_sync_timeouts_total"),
        "Total number of change batches not synchronized within the poll budget",
    )
    .unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Orphaned records removed by the prune sweep
pub static PRUNED_RECORDS_TOTAL: LazyLock<Counter> = LazyLock::new(|| {
    let counter = Counter::new(
        format!("{METRICS_NAMESPACE}_pruned_records_total"),
        "Total number of orphaned address records deleted by pruning",
    )
    .unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of failed reconciliations by error reason
///
/// Labels:
/// - `reason`: Error reason (e.g., `AddressInUse`, `SyncTimeout`)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by reason",
    );
    let counter = CounterVec::new(opts, &["reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a finished reconciliation
///
/// # Arguments
/// * `state` - Lifecycle state that triggered it
/// * `outcome` - `applied`, `no_action` or `error`
/// * `duration` - Wall time of the reconciliation
pub fn record_reconciliation(state: &str, outcome: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[state, outcome])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[state])
        .observe(duration.as_secs_f64());
}

/// Record one submitted change
pub fn record_change_submitted(action: &str) {
    CHANGES_SUBMITTED_TOTAL.with_label_values(&[action]).inc();
}

/// Record a change batch that did not synchronize within the poll budget
pub fn record_sync_timeout() {
    SYNC_TIMEOUTS_TOTAL.inc();
}

/// Record records deleted by a prune sweep
pub fn record_pruned(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    PRUNED_RECORDS_TOTAL.inc_by(count as f64);
}

/// Record an error
///
/// # Arguments
/// * `reason` - Error reason as returned by `ReconcileError::reason`
pub fn record_error(reason: &str) {
    ERRORS_TOTAL.with_label_values(&[reason]).inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
