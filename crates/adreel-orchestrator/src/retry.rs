//! Backoff for object store writes.
//!
//! Planning and dispatch never go through here: a failed analysis or a
//! rejected submission is reported to the caller as-is.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

/// Exponential backoff settings for one kind of operation.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Used in log lines
    pub operation_name: &'static str,
}

impl RetryConfig {
    pub fn new(operation_name: &'static str) -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            operation_name,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Read `{prefix}_MAX_RETRIES` and `{prefix}_BASE_MS` over the defaults.
    pub fn from_env(prefix: &str, operation_name: &'static str) -> Self {
        let defaults = Self::new(operation_name);
        let max_retries = std::env::var(format!("{}_MAX_RETRIES", prefix))
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_retries);
        let base_delay = std::env::var(format!("{}_BASE_MS", prefix))
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.base_delay);
        defaults.with_max_retries(max_retries).with_base_delay(base_delay)
    }

    /// Delay before retry number `attempt` (1-based), without jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn jittered_delay(&self, attempt: u32) -> Duration {
        let delay = self.delay_for_attempt(attempt);
        let jitter_ms = rand::rng().random_range(0..=delay.as_millis() as u64 / 4);
        (delay + Duration::from_millis(jitter_ms)).min(self.max_delay)
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// exhausts `config.max_retries`.
pub async fn retry_async<F, Fut, T, E, R>(
    config: &RetryConfig,
    operation: F,
    is_retryable: R,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    R: Fn(&E) -> bool,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < config.max_retries && is_retryable(&e) => {
                attempt += 1;
                let delay = config.jittered_delay(attempt);
                debug!(
                    operation = config.operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if attempt > 0 {
                    warn!(
                        operation = config.operation_name,
                        attempts = attempt + 1,
                        error = %e,
                        "Giving up after retries"
                    );
                }
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(name: &'static str) -> RetryConfig {
        RetryConfig::new(name).with_base_delay(Duration::from_millis(1))
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let config = RetryConfig::new("test")
            .with_base_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(500));

        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(400));
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(40), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry_async(
            &fast("put"),
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err("timeout".to_string())
                } else {
                    Ok(n)
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry_async(
            &fast("put"),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("invalid key".to_string())
            },
            |e| !e.contains("invalid"),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry_async(
            &fast("put").with_max_retries(2),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("unavailable".to_string())
            },
            |_| true,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        std::env::set_var("TEST_STORE_MAX_RETRIES", "7");
        std::env::set_var("TEST_STORE_BASE_MS", "50");
        let config = RetryConfig::from_env("TEST_STORE", "put");
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.base_delay, Duration::from_millis(50));
        std::env::remove_var("TEST_STORE_MAX_RETRIES");
        std::env::remove_var("TEST_STORE_BASE_MS");
    }
}
