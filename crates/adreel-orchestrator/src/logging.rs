//! Structured per-project logging.

use tracing::{error, info, warn, Span};

use adreel_models::ProjectId;

/// Logger that stamps every line with the project and the running phase.
#[derive(Debug, Clone)]
pub struct ProjectLogger {
    project_id: String,
    operation: &'static str,
    job_id: Option<String>,
}

impl ProjectLogger {
    pub fn new(project_id: &ProjectId, operation: &'static str) -> Self {
        Self {
            project_id: project_id.to_string(),
            operation,
            job_id: None,
        }
    }

    /// Attach the external batch job id to subsequent lines.
    pub fn with_job(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    fn job(&self) -> &str {
        self.job_id.as_deref().unwrap_or("-")
    }

    pub fn log_start(&self, message: &str) {
        info!(
            project_id = %self.project_id,
            operation = self.operation,
            job_id = self.job(),
            "Phase started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            project_id = %self.project_id,
            operation = self.operation,
            job_id = self.job(),
            "Phase progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            project_id = %self.project_id,
            operation = self.operation,
            job_id = self.job(),
            "Phase warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            project_id = %self.project_id,
            operation = self.operation,
            job_id = self.job(),
            "Phase failed: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            project_id = %self.project_id,
            operation = self.operation,
            job_id = self.job(),
            "Phase completed: {}", message
        );
    }

    /// Contextual matching fell back to tags for some segments.
    pub fn log_matching_degraded(&self, missing_segment_ids: &[String], cause: &str) {
        warn!(
            project_id = %self.project_id,
            operation = self.operation,
            event = "MatchingDegraded",
            degraded = missing_segment_ids.len(),
            segments = ?missing_segment_ids,
            "Contextual matching degraded to tags: {}", cause
        );
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn operation(&self) -> &str {
        self.operation
    }

    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "project",
            project_id = %self.project_id,
            operation = self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_carries_ids() {
        let id = ProjectId::from_string("p-42");
        let logger = ProjectLogger::new(&id, "dispatch");
        assert_eq!(logger.project_id(), "p-42");
        assert_eq!(logger.operation(), "dispatch");
        assert_eq!(logger.job(), "-");

        let logger = logger.with_job("job-7");
        assert_eq!(logger.job(), "job-7");
    }
}
