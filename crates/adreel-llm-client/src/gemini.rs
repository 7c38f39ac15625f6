//! Gemini client for script segmentation and contextual clip matching.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use adreel_models::{ClipAsset, Segment, SegmentConstraints};

use crate::config::LlmClientConfig;
use crate::error::{LlmError, LlmResult};
use crate::prompts::{build_analysis_prompt, build_matching_prompt};
use crate::service::{ClipChoice, SegmentDraft, TextAnalysisService};

/// Gemini API request.
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    temperature: f32,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct SegmentsPayload {
    segments: Vec<SegmentDraft>,
}

#[derive(Debug, Deserialize)]
struct AssignmentsPayload {
    assignments: Vec<ClipChoice>,
}

/// Strip a surrounding markdown code fence, if any.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

/// Gemini API client.
pub struct GeminiClient {
    http: Client,
    config: LlmClientConfig,
}

impl GeminiClient {
    pub fn new(config: LlmClientConfig) -> LlmResult<Self> {
        if config.models.is_empty() {
            return Err(LlmError::config("at least one Gemini model is required"));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(LlmError::Network)?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> LlmResult<Self> {
        Self::new(LlmClientConfig::from_env()?)
    }

    /// Run `prompt` against each configured model until one returns a parseable `T`.
    async fn generate<T: DeserializeOwned>(&self, operation: &str, prompt: &str) -> LlmResult<T> {
        let mut last_error = None;

        for model in &self.config.models {
            debug!(operation, model = %model, "Calling Gemini");
            match self.call_model::<T>(model, prompt).await {
                Ok(value) => {
                    info!(operation, model = %model, "Gemini call succeeded");
                    return Ok(value);
                }
                Err(e) => {
                    warn!(operation, model = %model, "Gemini call failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::config("no Gemini models configured")))
    }

    async fn call_model<T: DeserializeOwned>(&self, model: &str, prompt: &str) -> LlmResult<T> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        );

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                temperature: 0.2,
            },
        };

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status, body));
        }

        let body: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::malformed(format!("Gemini envelope: {}", e)))?;

        let text: String = body
            .candidates
            .first()
            .map(|c| c.content.parts.iter().map(|p| p.text.as_str()).collect())
            .filter(|t: &String| !t.trim().is_empty())
            .ok_or_else(|| LlmError::malformed("No content in Gemini response"))?;

        serde_json::from_str(strip_code_fence(&text))
            .map_err(|e| LlmError::malformed(format!("Gemini JSON payload: {}", e)))
    }
}

#[async_trait]
impl TextAnalysisService for GeminiClient {
    async fn analyze(
        &self,
        script: &str,
        constraints: &SegmentConstraints,
    ) -> LlmResult<Vec<SegmentDraft>> {
        let prompt = build_analysis_prompt(script, constraints);
        let payload: SegmentsPayload = self.generate("analyze", &prompt).await?;
        Ok(payload.segments)
    }

    async fn match_whole(
        &self,
        script: &str,
        segments: &[Segment],
        clips: &[ClipAsset],
    ) -> LlmResult<Vec<ClipChoice>> {
        let prompt = build_matching_prompt(script, segments, clips);
        let payload: AssignmentsPayload = self.generate("match_whole", &prompt).await?;
        Ok(payload.assignments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, models: &[&str]) -> GeminiClient {
        GeminiClient::new(LlmClientConfig {
            api_key: "test-key".to_string(),
            base_url: server.uri(),
            models: models.iter().map(|m| m.to_string()).collect(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn envelope(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        })
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n[]\n```"), "[]");
    }

    #[tokio::test]
    async fn test_analyze_parses_segments() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/model-a:generateContent"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
                r#"```json
{"segments":[{"text":"Buy our coffee.","duration_seconds":2.1,"keywords":["coffee"]}]}
```"#,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let drafts = client_for(&server, &["model-a"])
            .analyze("Buy our coffee.", &SegmentConstraints::default())
            .await
            .unwrap();

        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].keywords, vec!["coffee"]);
    }

    #[tokio::test]
    async fn test_falls_back_to_next_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/model-a:generateContent"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/models/model-b:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
                r#"{"assignments":[{"segment_id":"seg-1","clip_id":"c1"}]}"#,
            )))
            .mount(&server)
            .await;

        let choices = client_for(&server, &["model-a", "model-b"])
            .match_whole("s", &[], &[])
            .await
            .unwrap();

        assert_eq!(
            choices,
            vec![ClipChoice {
                segment_id: "seg-1".to_string(),
                clip_id: "c1".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_non_json_answer_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope("Sure! Here you go")))
            .mount(&server)
            .await;

        let err = client_for(&server, &["model-a"])
            .analyze("Buy our coffee.", &SegmentConstraints::default())
            .await
            .unwrap_err();
        assert!(err.is_malformed());
    }

    #[tokio::test]
    async fn test_unavailable_after_all_models() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server, &["model-a", "model-b"])
            .analyze("x", &SegmentConstraints::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::ServiceUnavailable(_)));
    }
}
