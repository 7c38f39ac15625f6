//! Narration synthesis over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::error::{LlmError, LlmResult};

/// Turns narration text into audio bytes (MP3).
#[async_trait]
pub trait NarrationSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: Option<&str>) -> LlmResult<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// Full URL of the synthesis endpoint
    pub endpoint: String,
    pub api_key: Option<String>,
    pub default_voice: String,
    pub timeout: Duration,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8002/synthesize".to_string(),
            api_key: None,
            default_voice: "narrator".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl TtsConfig {
    /// Create config from environment variables.
    pub fn from_env() -> LlmResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            endpoint: std::env::var("TTS_SERVICE_URL")
                .map_err(|_| LlmError::config("TTS_SERVICE_URL not set"))?,
            api_key: std::env::var("TTS_API_KEY").ok().filter(|k| !k.is_empty()),
            default_voice: std::env::var("TTS_DEFAULT_VOICE").unwrap_or(defaults.default_voice),
            timeout: std::env::var("TTS_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        })
    }
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    voice: &'a str,
    format: &'static str,
}

/// HTTP text-to-speech client.
pub struct TtsClient {
    http: Client,
    config: TtsConfig,
}

impl TtsClient {
    pub fn new(config: TtsConfig) -> LlmResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(LlmError::Network)?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> LlmResult<Self> {
        Self::new(TtsConfig::from_env()?)
    }
}

#[async_trait]
impl NarrationSynthesizer for TtsClient {
    async fn synthesize(&self, text: &str, voice: Option<&str>) -> LlmResult<Vec<u8>> {
        let voice = voice.unwrap_or(&self.config.default_voice);
        debug!(chars = text.len(), voice, "Requesting narration synthesis");

        let mut request = self.http.post(&self.config.endpoint).json(&SynthesisRequest {
            text,
            voice,
            format: "mp3",
        });
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status, body));
        }

        let audio = response.bytes().await?.to_vec();
        if audio.is_empty() {
            return Err(LlmError::malformed("synthesis returned no audio"));
        }
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, api_key: Option<&str>) -> TtsClient {
        TtsClient::new(TtsConfig {
            endpoint: format!("{}/synthesize", server.uri()),
            api_key: api_key.map(str::to_string),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_synthesize_returns_audio() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/synthesize"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(serde_json::json!({"voice": "warm", "format": "mp3"})))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .expect(1)
            .mount(&server)
            .await;

        let audio = client_for(&server, Some("secret"))
            .synthesize("Buy our coffee.", Some("warm"))
            .await
            .unwrap();
        assert_eq!(audio, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_default_voice_used() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({"voice": "narrator"})))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![9u8]))
            .expect(1)
            .mount(&server)
            .await;

        let audio = client_for(&server, None).synthesize("Hi", None).await.unwrap();
        assert_eq!(audio, vec![9]);
    }

    #[tokio::test]
    async fn test_empty_audio_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let err = client_for(&server, None).synthesize("Hi", None).await.unwrap_err();
        assert!(err.is_malformed());
    }
}
