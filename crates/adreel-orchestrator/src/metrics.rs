//! Orchestrator phase metrics.

use metrics::{counter, histogram};

pub mod names {
    /// Phase runs by phase and outcome (`ok` or an error kind).
    pub const PHASE_TOTAL: &str = "adreel_phase_total";
    pub const PHASE_DURATION_SECONDS: &str = "adreel_phase_duration_seconds";
    /// Segments that fell back from contextual to tag matching.
    pub const MATCH_DEGRADED_SEGMENTS_TOTAL: &str = "adreel_match_degraded_segments_total";
    /// Render specs spilled to the object store.
    pub const SPEC_SPILLS_TOTAL: &str = "adreel_spec_spills_total";
    /// Extra parameters dropped to fit the batch budget.
    pub const PARAMS_DROPPED_TOTAL: &str = "adreel_params_dropped_total";
    /// Status lookups that failed and were treated as transient.
    pub const POLL_LOOKUP_FAILURES_TOTAL: &str = "adreel_poll_lookup_failures_total";
}

pub fn record_phase(phase: &'static str, outcome: &'static str, duration_secs: f64) {
    let labels = [("phase", phase.to_string()), ("outcome", outcome.to_string())];
    counter!(names::PHASE_TOTAL, &labels).increment(1);
    histogram!(names::PHASE_DURATION_SECONDS, "phase" => phase).record(duration_secs);
}

pub fn record_degraded_segments(count: usize) {
    counter!(names::MATCH_DEGRADED_SEGMENTS_TOTAL).increment(count as u64);
}

pub fn record_spill() {
    counter!(names::SPEC_SPILLS_TOTAL).increment(1);
}

pub fn record_dropped_params(count: usize) {
    counter!(names::PARAMS_DROPPED_TOTAL).increment(count as u64);
}

pub fn record_poll_lookup_failure() {
    counter!(names::POLL_LOOKUP_FAILURES_TOTAL).increment(1);
}
