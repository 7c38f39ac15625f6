//! Render spec and packaged render job types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One clip entry on the render timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderSegment {
    /// Fetch URL of the source clip
    pub clip_url: String,
    /// Timeline start in seconds
    pub start_time: f64,
    /// Playback duration in seconds
    pub duration: f64,
    /// Zero-based render order
    pub position: u32,
}

/// A timed subtitle line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubtitleCue {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// Subtitle burn-in options carried to the render container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubtitleOptions {
    pub style: String,
    pub font_size: u32,
    pub position: String,
    pub cues: Vec<SubtitleCue>,
}

/// Watermark overlay options carried to the render container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WatermarkOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub position: String,
    pub opacity: f32,
}

/// Output container and geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OutputFormat {
    pub container: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for OutputFormat {
    fn default() -> Self {
        // Vertical 9:16 is the default ad placement
        Self {
            container: "mp4".to_string(),
            width: 1080,
            height: 1920,
            fps: 30,
        }
    }
}

/// Fully-resolved description of the video the render container produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderSpec {
    pub segments: Vec<RenderSegment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voiceover_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_options: Option<SubtitleOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark_options: Option<WatermarkOptions>,
    pub output_format: OutputFormat,
}

impl RenderSpec {
    /// Total timeline length in seconds.
    pub fn total_duration(&self) -> f64 {
        self.segments
            .iter()
            .map(|s| s.start_time + s.duration)
            .fold(0.0, f64::max)
    }
}

/// Caller-facing subtitle switch and styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubtitleSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_subtitle_style")]
    pub style: String,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_subtitle_position")]
    pub position: String,
}

fn default_subtitle_style() -> String {
    "bold_outline".to_string()
}

fn default_font_size() -> u32 {
    48
}

fn default_subtitle_position() -> String {
    "bottom".to_string()
}

impl Default for SubtitleSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            style: default_subtitle_style(),
            font_size: default_font_size(),
            position: default_subtitle_position(),
        }
    }
}

/// Caller-facing watermark switch and content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WatermarkSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub text: Option<String>,
    /// Object store key of a watermark image
    #[serde(default)]
    pub image_key: Option<String>,
    #[serde(default = "default_watermark_position")]
    pub position: String,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
}

fn default_watermark_position() -> String {
    "top_right".to_string()
}

fn default_opacity() -> f32 {
    0.6
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            text: None,
            image_key: None,
            position: default_watermark_position(),
            opacity: default_opacity(),
        }
    }
}

/// Options supplied by the caller of the packaging step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderOptions {
    /// Explicit output key; always wins over anything in `extra_params`
    #[serde(default)]
    pub output_location: Option<String>,
    #[serde(default)]
    pub subtitles: SubtitleSettings,
    #[serde(default)]
    pub watermark: WatermarkSettings,
    #[serde(default)]
    pub output_format: OutputFormat,
    /// Free-form parameters forwarded to the batch job
    #[serde(default)]
    pub extra_params: BTreeMap<String, String>,
}

/// How the render spec reaches the batch job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderInput {
    /// Spec is small enough to travel inside the job parameters
    Inline { spec: RenderSpec },
    /// Spec was spilled to the object store under `key`
    Spilled { key: String },
}

/// Result of a packaging run, persisted on the project until dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PackagedRender {
    /// Scopes spilled objects so concurrent runs never collide
    pub run_id: String,
    /// Final output key for the rendered video
    pub output_location: String,
    pub input: RenderInput,
    /// Extra parameters with reserved keys already filtered out
    #[serde(default)]
    pub extra_params: BTreeMap<String, String>,
    /// Serialized size of the spec in bytes
    pub spec_bytes: usize,
    pub packaged_at: DateTime<Utc>,
}

impl PackagedRender {
    /// Object store key of the spilled spec, if it was spilled.
    pub fn spilled_key(&self) -> Option<&str> {
        match &self.input {
            RenderInput::Spilled { key } => Some(key),
            RenderInput::Inline { .. } => None,
        }
    }
}
