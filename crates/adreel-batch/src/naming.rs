//! Job name generation.
//!
//! Names are `{job_type}-{yyyymmddHHMMSS}-{8 hex}`. The random suffix makes
//! two dispatches in the same second distinct without any shared counter;
//! the external job id, not the name, identifies a job afterward.

use chrono::{DateTime, Utc};

/// Longest job name the batch service accepts.
pub const MAX_JOB_NAME_LEN: usize = 128;

const SUFFIX_LEN: usize = 1 + 14 + 1 + 8;

/// Replace anything outside `[A-Za-z0-9_-]` and make sure the name starts alphanumeric.
fn sanitize(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches(|c: char| !c.is_ascii_alphanumeric());
    if trimmed.is_empty() {
        "job".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Generate a fresh job name for `job_type` at `now`.
pub fn job_name(job_type: &str, now: DateTime<Utc>) -> String {
    let mut prefix = sanitize(job_type);
    prefix.truncate(MAX_JOB_NAME_LEN - SUFFIX_LEN);
    format!(
        "{}-{}-{:08x}",
        prefix,
        now.format("%Y%m%d%H%M%S"),
        rand::random::<u32>()
    )
}
