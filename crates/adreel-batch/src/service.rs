//! The batch compute seam.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use adreel_models::BatchJobState;

use crate::error::BatchResult;

/// A job submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub job_name: String,
    pub parameters: BTreeMap<String, String>,
}

/// What the batch service returned for an accepted submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedJob {
    /// Authoritative identifier for later lookups
    pub job_id: String,
    pub job_name: String,
}

/// Point-in-time view of a submitted job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescription {
    pub state: BatchJobState,
    /// Human-readable status reason, if the service gave one
    pub reason: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
}

impl JobDescription {
    pub fn new(state: BatchJobState) -> Self {
        Self {
            state,
            reason: None,
            started_at: None,
            stopped_at: None,
        }
    }
}

#[async_trait]
pub trait BatchService: Send + Sync {
    /// Submit one job; exactly one external call.
    async fn submit(&self, request: SubmitRequest) -> BatchResult<SubmittedJob>;

    /// Look up one job's status; exactly one external call.
    async fn describe(&self, job_id: &str) -> BatchResult<JobDescription>;
}
