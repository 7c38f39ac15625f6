//! Batch compute job records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// A job submitted to the external batch compute service.
///
/// Immutable once created; a retry creates a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BatchJob {
    /// Identifier returned by the batch service (authoritative)
    pub external_job_id: String,
    /// Generated job name (informational)
    pub external_job_name: String,
    pub submitted_at: DateTime<Utc>,
}

/// External batch job state vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BatchJobState {
    Submitted,
    Pending,
    Runnable,
    Starting,
    Running,
    Succeeded,
    Failed,
}

impl BatchJobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchJobState::Submitted => "submitted",
            BatchJobState::Pending => "pending",
            BatchJobState::Runnable => "runnable",
            BatchJobState::Starting => "starting",
            BatchJobState::Running => "running",
            BatchJobState::Succeeded => "succeeded",
            BatchJobState::Failed => "failed",
        }
    }

    /// No further state changes are expected.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchJobState::Succeeded | BatchJobState::Failed)
    }
}

impl fmt::Display for BatchJobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BatchJobState {
    type Err = ModelError;

    /// Parse case-insensitively (the batch service reports `RUNNING` etc.).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "submitted" => Ok(BatchJobState::Submitted),
            "pending" => Ok(BatchJobState::Pending),
            "runnable" => Ok(BatchJobState::Runnable),
            "starting" => Ok(BatchJobState::Starting),
            "running" => Ok(BatchJobState::Running),
            "succeeded" => Ok(BatchJobState::Succeeded),
            "failed" => Ok(BatchJobState::Failed),
            other => Err(ModelError::UnknownJobState(other.to_string())),
        }
    }
}
