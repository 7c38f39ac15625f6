//! The text analysis seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use adreel_models::{ClipAsset, Segment, SegmentConstraints};

use crate::error::LlmResult;

/// A segment as proposed by the language model, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDraft {
    pub text: String,
    pub duration_seconds: f64,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// One segment-to-clip pick from whole-script matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipChoice {
    pub segment_id: String,
    pub clip_id: String,
}

#[async_trait]
pub trait TextAnalysisService: Send + Sync {
    /// Split a narration script into timed, keyworded drafts.
    async fn analyze(
        &self,
        script: &str,
        constraints: &SegmentConstraints,
    ) -> LlmResult<Vec<SegmentDraft>>;

    /// Pick one clip per segment with the whole script in view.
    async fn match_whole(
        &self,
        script: &str,
        segments: &[Segment],
        clips: &[ClipAsset],
    ) -> LlmResult<Vec<ClipChoice>>;
}
