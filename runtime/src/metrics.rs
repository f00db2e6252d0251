//! Metric names and recording helpers.
//!
//! The runtime records through the `metrics` facade; install any recorder
//! (Prometheus, statsd, a test recorder) in the host binary to collect them.
//! Without a recorder every call is a no-op.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Register descriptions for every metric the runtime emits.
///
/// Call once after installing a recorder.
pub fn register_metrics() {
    describe_counter!("store.actions.dispatched", "Actions accepted by the store");
    describe_counter!(
        "store.actions.rejected",
        "Actions rejected because the store was shutting down"
    );
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time spent in the root reducer per action"
    );
    describe_counter!("effects.started", "Effect runs started, by mode");
    describe_counter!("effects.cancelled", "Effect runs cancelled by a newer run");
    describe_counter!("effects.ignored", "Actions ignored while a leading run was active");
    describe_counter!("effects.failed", "Effect runs that returned an error or panicked");
}

/// Store metrics
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record one reduced action
    pub fn record_dispatch(duration: Duration) {
        counter!("store.actions.dispatched").increment(1);
        histogram!("store.reducer.duration_seconds").record(duration.as_secs_f64());
    }

    /// Record an action rejected during shutdown
    pub fn record_rejected() {
        counter!("store.actions.rejected").increment(1);
    }
}

/// Effect metrics
pub struct EffectMetrics;

impl EffectMetrics {
    /// Record a started run
    pub fn record_started(action_type: &str, mode: &'static str) {
        counter!(
            "effects.started",
            "action_type" => action_type.to_string(),
            "mode" => mode
        )
        .increment(1);
    }

    /// Record a run cancelled by a newer one
    pub fn record_cancelled(action_type: &str) {
        counter!("effects.cancelled", "action_type" => action_type.to_string()).increment(1);
    }

    /// Record an action dropped because a leading run is active
    pub fn record_ignored(action_type: &str) {
        counter!("effects.ignored", "action_type" => action_type.to_string()).increment(1);
    }

    /// Record a failed run
    pub fn record_failure(action_type: &str) {
        counter!("effects.failed", "action_type" => action_type.to_string()).increment(1);
    }
}
