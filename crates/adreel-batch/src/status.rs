//! Progress mapping for external job states.

use std::time::Duration;

use chrono::{DateTime, Utc};

use adreel_models::BatchJobState;

use crate::service::JobDescription;

/// Percentage reported for a state before elapsed time is considered.
fn base_progress(state: BatchJobState) -> u8 {
    match state {
        BatchJobState::Submitted => 5,
        BatchJobState::Pending => 10,
        BatchJobState::Runnable => 15,
        BatchJobState::Starting => 20,
        BatchJobState::Running => 25,
        BatchJobState::Succeeded => 100,
        BatchJobState::Failed => 0,
    }
}

/// Running jobs climb from 25 toward 95 over the expected render time.
fn running_progress(started_at: Option<DateTime<Utc>>, now: DateTime<Utc>, expected: Duration) -> u8 {
    let elapsed = started_at
        .and_then(|start| (now - start).to_std().ok())
        .unwrap_or_default();
    let expected_secs = expected.as_secs_f64().max(1.0);
    let fraction = (elapsed.as_secs_f64() / expected_secs).min(1.0);
    let value = 25.0 + 70.0 * fraction;
    value.floor().min(95.0) as u8
}

/// Progress to report for `job`, never lower than `previous`.
///
/// A succeeded job always reports 100.
pub fn progress_for(
    job: &JobDescription,
    now: DateTime<Utc>,
    expected: Duration,
    previous: u8,
) -> u8 {
    let computed = match job.state {
        BatchJobState::Succeeded => return 100,
        BatchJobState::Running => running_progress(job.started_at, now, expected),
        state => base_progress(state),
    };
    computed.max(previous.min(100))
}
