//! Gemini client configuration.

use std::time::Duration;

use crate::error::{LlmError, LlmResult};

/// Models tried in order until one answers.
pub const DEFAULT_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-2.5-flash-lite", "gemini-2.5-pro"];

#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    pub api_key: String,
    /// API root, e.g. `https://generativelanguage.googleapis.com/v1beta`
    pub base_url: String,
    /// Fallback list; the first model that answers wins
    pub models: Vec<String>,
    pub timeout: Duration,
}

impl Default for LlmClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl LlmClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> LlmResult<Self> {
        let defaults = Self::default();
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| LlmError::config("GEMINI_API_KEY not set"))?;

        let models = std::env::var("GEMINI_MODELS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|m| !m.is_empty())
            .unwrap_or(defaults.models);

        Ok(Self {
            api_key,
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            models,
            timeout: std::env::var("GEMINI_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env_requires_key() {
        std::env::remove_var("GEMINI_API_KEY");
        assert!(LlmClientConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_model_list_from_env() {
        std::env::set_var("GEMINI_API_KEY", "k");
        std::env::set_var("GEMINI_MODELS", "model-a, model-b,,");
        let config = LlmClientConfig::from_env().unwrap();
        assert_eq!(config.models, vec!["model-a", "model-b"]);
        std::env::remove_var("GEMINI_MODELS");

        let config = LlmClientConfig::from_env().unwrap();
        assert_eq!(config.models.len(), DEFAULT_MODELS.len());
        std::env::remove_var("GEMINI_API_KEY");
    }
}
