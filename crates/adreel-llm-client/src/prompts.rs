//! Prompt builders for Gemini.

use serde_json::json;

use adreel_models::{ClipAsset, Segment, SegmentConstraints};

/// Typical narration pace used to estimate durations.
pub const WORDS_PER_SECOND: f64 = 2.5;

pub fn build_analysis_prompt(script: &str, constraints: &SegmentConstraints) -> String {
    format!(
        r#"You are editing the narration for a short vertical video ad.

Split the SCRIPT below into consecutive narration segments, in order, covering
every word exactly once. For each segment estimate how long it takes to speak
at about {wps} words per second, and list 1 to 4 concrete visual keywords that
describe footage which would fit it (objects, places, actions, moods).

Segment rules:
- Aim for {min}-{max} seconds per segment.
- Never exceed {words} words in one segment.
- Keep sentence boundaries where possible.

Return ONLY a single JSON object with this schema:
{{
  "segments": [
    {{ "text": "Exact narration text", "duration_seconds": 2.4, "keywords": ["coffee", "morning"] }}
  ]
}}

SCRIPT:
{script}
"#,
        wps = WORDS_PER_SECOND,
        min = constraints.min_seconds,
        max = constraints.max_seconds,
        words = constraints.max_words_per_segment,
        script = script.trim(),
    )
}

pub fn build_matching_prompt(script: &str, segments: &[Segment], clips: &[ClipAsset]) -> String {
    let segment_list: Vec<_> = segments
        .iter()
        .map(|s| json!({"segment_id": s.id, "text": s.text, "keywords": s.keywords}))
        .collect();
    let clip_list: Vec<_> = clips
        .iter()
        .map(|c| json!({"clip_id": c.id, "name": c.name, "tags": c.tags}))
        .collect();

    format!(
        r#"You are choosing b-roll for a short video ad.

Read the whole SCRIPT for context, then pick the single best clip from CLIPS
for every entry in SEGMENTS. A clip may be reused. Prefer visual continuity
between neighbouring segments. Only use clip_id values that appear in CLIPS.

Return ONLY a single JSON object with this schema:
{{
  "assignments": [
    {{ "segment_id": "seg-1", "clip_id": "clip id from CLIPS" }}
  ]
}}

SCRIPT:
{script}

SEGMENTS:
{segments}

CLIPS:
{clips}
"#,
        script = script.trim(),
        segments = serde_json::Value::Array(segment_list),
        clips = serde_json::Value::Array(clip_list),
    )
}
