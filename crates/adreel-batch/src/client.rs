//! AWS Batch implementation of the batch service.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_batch::config::Region;
use aws_sdk_batch::error::DisplayErrorContext;
use aws_sdk_batch::types::JobStatus;
use aws_sdk_batch::Client;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use adreel_models::BatchJobState;

use crate::error::{BatchError, BatchResult};
use crate::service::{BatchService, JobDescription, SubmitRequest, SubmittedJob};

/// AWS Batch configuration.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Job queue ARN or name
    pub job_queue: String,
    /// Job definition ARN or `name:revision`
    pub job_definition: String,
    pub region: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            job_queue: String::new(),
            job_definition: String::new(),
            region: "us-east-1".to_string(),
        }
    }
}

impl BatchConfig {
    /// Create config from environment variables.
    pub fn from_env() -> BatchResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            job_queue: std::env::var("BATCH_JOB_QUEUE")
                .map_err(|_| BatchError::config("BATCH_JOB_QUEUE not set"))?,
            job_definition: std::env::var("BATCH_JOB_DEFINITION")
                .map_err(|_| BatchError::config("BATCH_JOB_DEFINITION not set"))?,
            region: std::env::var("BATCH_REGION")
                .or_else(|_| std::env::var("AWS_REGION"))
                .unwrap_or(defaults.region),
        })
    }
}

/// Map the AWS job status vocabulary onto ours.
fn map_status(status: &JobStatus) -> BatchResult<BatchJobState> {
    status
        .as_str()
        .parse::<BatchJobState>()
        .map_err(|_| BatchError::UnknownState(status.as_str().to_string()))
}

fn millis_to_utc(ms: Option<i64>) -> Option<DateTime<Utc>> {
    ms.filter(|ms| *ms > 0)
        .and_then(DateTime::<Utc>::from_timestamp_millis)
}

/// Batch service client backed by AWS Batch.
#[derive(Clone)]
pub struct AwsBatchClient {
    client: Client,
    config: BatchConfig,
}

impl AwsBatchClient {
    /// Create a client using the default AWS credential chain.
    pub async fn new(config: BatchConfig) -> BatchResult<Self> {
        if config.job_queue.is_empty() || config.job_definition.is_empty() {
            return Err(BatchError::config("job queue and job definition are required"));
        }

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        info!(
            job_queue = %config.job_queue,
            job_definition = %config.job_definition,
            "Batch client configured"
        );

        Ok(Self {
            client: Client::new(&shared),
            config,
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> BatchResult<Self> {
        Self::new(BatchConfig::from_env()?).await
    }
}

#[async_trait]
impl BatchService for AwsBatchClient {
    async fn submit(&self, request: SubmitRequest) -> BatchResult<SubmittedJob> {
        debug!(
            job_name = %request.job_name,
            params = request.parameters.len(),
            "Submitting batch job"
        );

        let parameters: HashMap<String, String> = request.parameters.into_iter().collect();
        let output = self
            .client
            .submit_job()
            .job_name(&request.job_name)
            .job_queue(&self.config.job_queue)
            .job_definition(&self.config.job_definition)
            .set_parameters(Some(parameters))
            .send()
            .await
            .map_err(|e| BatchError::submit_failed(DisplayErrorContext(&e).to_string()))?;

        let job_id: Option<&str> = output.job_id().into();
        let job_id = job_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| BatchError::submit_failed("response carried no job id"))?;
        let job_name: Option<&str> = output.job_name().into();

        Ok(SubmittedJob {
            job_id: job_id.to_string(),
            job_name: job_name.unwrap_or(&request.job_name).to_string(),
        })
    }

    async fn describe(&self, job_id: &str) -> BatchResult<JobDescription> {
        let output = self
            .client
            .describe_jobs()
            .jobs(job_id)
            .send()
            .await
            .map_err(|e| BatchError::describe_failed(DisplayErrorContext(&e).to_string()))?;

        let detail = output
            .jobs()
            .first()
            .ok_or_else(|| BatchError::JobNotFound(job_id.to_string()))?;

        let status: Option<&JobStatus> = detail.status().into();
        let status = status
            .ok_or_else(|| BatchError::describe_failed(format!("job {job_id} has no status")))?;

        let started_at: Option<i64> = detail.started_at().into();
        let stopped_at: Option<i64> = detail.stopped_at().into();
        let reason: Option<&str> = detail.status_reason().into();

        Ok(JobDescription {
            state: map_status(status)?,
            reason: reason.filter(|r| !r.trim().is_empty()).map(str::to_string),
            started_at: millis_to_utc(started_at),
            stopped_at: millis_to_utc(stopped_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_status_mapping() {
        assert_eq!(map_status(&JobStatus::Running).unwrap(), BatchJobState::Running);
        assert_eq!(map_status(&JobStatus::Succeeded).unwrap(), BatchJobState::Succeeded);
        assert_eq!(map_status(&JobStatus::Runnable).unwrap(), BatchJobState::Runnable);
    }

    #[test]
    fn test_zero_timestamps_ignored() {
        assert!(millis_to_utc(Some(0)).is_none());
        assert!(millis_to_utc(None).is_none());
        assert!(millis_to_utc(Some(1_700_000_000_000)).is_some());
    }

    #[test]
    #[serial]
    fn test_from_env_requires_queue_and_definition() {
        std::env::remove_var("BATCH_JOB_QUEUE");
        std::env::remove_var("BATCH_JOB_DEFINITION");
        assert!(BatchConfig::from_env().is_err());

        std::env::set_var("BATCH_JOB_QUEUE", "render-queue");
        std::env::set_var("BATCH_JOB_DEFINITION", "ad-render:3");
        std::env::set_var("BATCH_REGION", "eu-west-1");
        let config = BatchConfig::from_env().unwrap();
        assert_eq!(config.job_definition, "ad-render:3");
        assert_eq!(config.region, "eu-west-1");

        for var in ["BATCH_JOB_QUEUE", "BATCH_JOB_DEFINITION", "BATCH_REGION"] {
            std::env::remove_var(var);
        }
    }
}
