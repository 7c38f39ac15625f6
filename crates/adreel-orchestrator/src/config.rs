//! Orchestrator configuration.

use std::time::Duration;

use adreel_models::SegmentConstraints;

use crate::retry::RetryConfig;

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Constraints used when a planning request does not supply its own
    pub default_constraints: SegmentConstraints,
    /// Serialized specs at or above this size are spilled to the object store
    pub max_inline_bytes: usize,
    /// Byte budget for batch job parameters (keys plus values)
    pub max_param_bytes: usize,
    /// `JOB_TYPE` parameter and job name prefix
    pub job_type: String,
    /// Typical render wall time, drives the running-progress curve
    pub expected_render_time: Duration,
    /// Upper bound on clips placed in one segment
    pub max_clips_per_segment: usize,
    /// Backoff for object store writes
    pub storage_retry: RetryConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_constraints: SegmentConstraints::default(),
            max_inline_bytes: 20_480,
            max_param_bytes: 30_720, // AWS Batch limit on submitted parameters
            job_type: "ad-render".to_string(),
            expected_render_time: Duration::from_secs(180),
            max_clips_per_segment: 3,
            storage_retry: RetryConfig::new("object_store_put"),
        }
    }
}

impl OrchestratorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let constraints = SegmentConstraints {
            min_seconds: env_parse("SEGMENT_MIN_SECONDS")
                .unwrap_or(defaults.default_constraints.min_seconds),
            max_seconds: env_parse("SEGMENT_MAX_SECONDS")
                .unwrap_or(defaults.default_constraints.max_seconds),
            max_words_per_segment: env_parse("SEGMENT_MAX_WORDS")
                .unwrap_or(defaults.default_constraints.max_words_per_segment),
        };

        Self {
            default_constraints: constraints,
            max_inline_bytes: env_parse("RENDER_MAX_INLINE_BYTES")
                .unwrap_or(defaults.max_inline_bytes),
            max_param_bytes: env_parse("BATCH_MAX_PARAM_BYTES").unwrap_or(defaults.max_param_bytes),
            job_type: std::env::var("RENDER_JOB_TYPE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.job_type),
            expected_render_time: env_parse("RENDER_EXPECTED_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.expected_render_time),
            max_clips_per_segment: env_parse::<usize>("MATCH_MAX_CLIPS_PER_SEGMENT")
                .unwrap_or(defaults.max_clips_per_segment)
                .max(1),
            storage_retry: RetryConfig::from_env("STORAGE_RETRY", "object_store_put"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_inline_bytes, 20_480);
        assert_eq!(config.max_param_bytes, 30_720);
        assert_eq!(config.job_type, "ad-render");
        assert!(config.max_inline_bytes < config.max_param_bytes);
        assert!(config.default_constraints.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("SEGMENT_MIN_SECONDS", "1.5");
        std::env::set_var("RENDER_MAX_INLINE_BYTES", "4096");
        std::env::set_var("RENDER_JOB_TYPE", "promo-render");
        std::env::set_var("MATCH_MAX_CLIPS_PER_SEGMENT", "0");

        let config = OrchestratorConfig::from_env();
        assert_eq!(config.default_constraints.min_seconds, 1.5);
        assert_eq!(config.default_constraints.max_seconds, 8.0);
        assert_eq!(config.max_inline_bytes, 4096);
        assert_eq!(config.job_type, "promo-render");
        assert_eq!(config.max_clips_per_segment, 1);

        std::env::remove_var("SEGMENT_MIN_SECONDS");
        std::env::remove_var("RENDER_MAX_INLINE_BYTES");
        std::env::remove_var("RENDER_JOB_TYPE");
        std::env::remove_var("MATCH_MAX_CLIPS_PER_SEGMENT");
    }
}
