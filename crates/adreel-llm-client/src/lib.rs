//! Clients for the language-model and speech collaborators.
//!
//! - `TextAnalysisService`: segment a narration script, match segments to clips
//! - `GeminiClient`: Gemini `generateContent` implementation with model fallback
//! - `NarrationSynthesizer` / `TtsClient`: text-to-speech over HTTP

pub mod config;
pub mod error;
pub mod gemini;
pub mod prompts;
pub mod service;
pub mod tts;

pub use config::LlmClientConfig;
pub use error::{LlmError, LlmResult};
pub use gemini::GeminiClient;
pub use service::{ClipChoice, SegmentDraft, TextAnalysisService};
pub use tts::{NarrationSynthesizer, TtsClient, TtsConfig};
