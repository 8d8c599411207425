//! Observability infrastructure for the labeller
//!
//! Provides:
//! - Prometheus metrics (pass latency, matches, label writes, index size)
//! - Structured JSON logging with tracing

use crate::network_index::RebuildStats;
use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for pass latency (in seconds)
const PASS_LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<LabellerMetricsInner> = OnceLock::new();

struct LabellerMetricsInner {
    pass_latency_seconds: Histogram,
    matches_found: IntCounter,
    labels_applied: IntCounter,
    labels_unchanged: IntCounter,
    apply_errors: IntCounter,
    backend_errors: IntCounter,
    index_addresses: IntGauge,
    index_rebuilds: IntCounter,
}

impl LabellerMetricsInner {
    fn new() -> Self {
        Self {
            pass_latency_seconds: register_histogram!(
                "styx_labeller_pass_latency_seconds",
                "Time spent running one labelling pass",
                PASS_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register pass_latency_seconds"),

            matches_found: register_int_counter!(
                "styx_labeller_matches_found_total",
                "Resource matches produced by resolution"
            )
            .expect("Failed to register matches_found"),

            labels_applied: register_int_counter!(
                "styx_labeller_labels_applied_total",
                "Resources whose labels were written"
            )
            .expect("Failed to register labels_applied"),

            labels_unchanged: register_int_counter!(
                "styx_labeller_labels_unchanged_total",
                "Resources that already carried the desired labels"
            )
            .expect("Failed to register labels_unchanged"),

            apply_errors: register_int_counter!(
                "styx_labeller_apply_errors_total",
                "Label writes that failed"
            )
            .expect("Failed to register apply_errors"),

            backend_errors: register_int_counter!(
                "styx_labeller_backend_errors_total",
                "Resource listings or fetches that failed"
            )
            .expect("Failed to register backend_errors"),

            index_addresses: register_int_gauge!(
                "styx_labeller_index_addresses",
                "Distinct addresses in the current network index"
            )
            .expect("Failed to register index_addresses"),

            index_rebuilds: register_int_counter!(
                "styx_labeller_index_rebuilds_total",
                "Network index rebuilds"
            )
            .expect("Failed to register index_rebuilds"),
        }
    }
}

/// Labeller metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct LabellerMetrics {
    _private: (),
}

impl Default for LabellerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl LabellerMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(LabellerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &LabellerMetricsInner {
        GLOBAL_METRICS.get_or_init(LabellerMetricsInner::new)
    }

    pub fn observe_pass_latency(&self, duration_secs: f64) {
        self.inner().pass_latency_seconds.observe(duration_secs);
    }

    pub fn add_matches(&self, count: usize) {
        self.inner().matches_found.inc_by(count as u64);
    }

    pub fn inc_labels_applied(&self) {
        self.inner().labels_applied.inc();
    }

    pub fn inc_labels_unchanged(&self) {
        self.inner().labels_unchanged.inc();
    }

    pub fn inc_apply_errors(&self) {
        self.inner().apply_errors.inc();
    }

    pub fn inc_backend_errors(&self) {
        self.inner().backend_errors.inc();
    }

    /// Record a completed index rebuild
    pub fn record_index_rebuild(&self, addresses: usize) {
        self.inner().index_rebuilds.inc();
        self.inner().index_addresses.set(addresses as i64);
    }
}

/// Structured logger for labeller events
///
/// Emits event-tagged records for matches, label writes, passes and
/// lifecycle transitions.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl Default for StructuredLogger {
    fn default() -> Self {
        Self::new("styx-labeller")
    }
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Log a resource matched to a target
    pub fn log_match(&self, target: &str, resource: &str, confidence: f64, source: &str) {
        info!(
            event = "match_found",
            instance = %self.instance,
            target = %target,
            resource = %resource,
            confidence = confidence,
            source = %source,
            "Matched resource to target"
        );
    }

    /// Log a label write, or its failure
    pub fn log_labels_applied(&self, resource: &str, label_count: usize, error: Option<&str>) {
        match error {
            None => info!(
                event = "labels_applied",
                instance = %self.instance,
                resource = %resource,
                label_count = label_count,
                "Applied labels to resource"
            ),
            Some(error) => warn!(
                event = "labels_apply_failed",
                instance = %self.instance,
                resource = %resource,
                error = %error,
                "Failed to apply labels to resource"
            ),
        }
    }

    /// Log the outcome of one labelling pass
    pub fn log_pass_completed(
        &self,
        pods: usize,
        matches: usize,
        updated: usize,
        unchanged: usize,
        errors: usize,
        duration_secs: f64,
    ) {
        if errors == 0 {
            info!(
                event = "pass_completed",
                instance = %self.instance,
                pods = pods,
                matches = matches,
                updated = updated,
                unchanged = unchanged,
                duration_secs = duration_secs,
                "Labelling pass completed"
            );
        } else {
            warn!(
                event = "pass_completed",
                instance = %self.instance,
                pods = pods,
                matches = matches,
                updated = updated,
                unchanged = unchanged,
                errors = errors,
                duration_secs = duration_secs,
                "Labelling pass completed with errors"
            );
        }
    }

    /// Log a network index rebuild
    pub fn log_index_rebuilt(&self, stats: &RebuildStats) {
        info!(
            event = "index_rebuilt",
            instance = %self.instance,
            types_listed = stats.types_listed,
            types_failed = stats.types_failed,
            resources = stats.resources_with_addresses,
            addresses = stats.addresses,
            "Network index rebuilt"
        );
    }

    /// Log controller startup
    pub fn log_startup(&self, version: &str, interval_secs: u64) {
        info!(
            event = "controller_started",
            instance = %self.instance,
            version = %version,
            interval_secs = interval_secs,
            "Labeller controller started"
        );
    }

    /// Log controller shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "controller_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Labeller controller shutting down"
        );
    }
}
