//! Clip matching: segment to clip slots, laid out on a contiguous timeline.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use adreel_llm_client::TextAnalysisService;
use adreel_models::{ClipAsset, ClipSlot, SceneAssignment, Segment};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::tag_matcher;

const EPSILON: f64 = 1e-9;

/// How clips are chosen for segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Keyword/tag overlap only, no external calls
    #[default]
    Tag,
    /// One language-model call over the whole script, tags as fallback
    Contextual,
}

impl MatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStrategy::Tag => "tag",
            MatchStrategy::Contextual => "contextual",
        }
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MatchStrategy {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tag" => Ok(MatchStrategy::Tag),
            "contextual" => Ok(MatchStrategy::Contextual),
            other => Err(OrchestratorError::invalid_input(format!(
                "unknown match strategy '{}'",
                other
            ))),
        }
    }
}

/// A scene list, possibly with segments that fell back to tag matching.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    Full(Vec<SceneAssignment>),
    Partial {
        assignments: Vec<SceneAssignment>,
        missing_segment_ids: Vec<String>,
    },
}

impl MatchResult {
    pub fn assignments(&self) -> &[SceneAssignment] {
        match self {
            MatchResult::Full(assignments) => assignments,
            MatchResult::Partial { assignments, .. } => assignments,
        }
    }

    pub fn into_assignments(self) -> Vec<SceneAssignment> {
        match self {
            MatchResult::Full(assignments) => assignments,
            MatchResult::Partial { assignments, .. } => assignments,
        }
    }

    /// Segments that were matched by tags instead of by context.
    pub fn missing_segment_ids(&self) -> &[String] {
        match self {
            MatchResult::Full(_) => &[],
            MatchResult::Partial {
                missing_segment_ids,
                ..
            } => missing_segment_ids,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, MatchResult::Partial { .. })
    }
}

/// Match every segment by tag score alone.
pub fn match_by_tags(
    segments: &[Segment],
    clips: &[ClipAsset],
    max_clips_per_segment: usize,
) -> OrchestratorResult<Vec<SceneAssignment>> {
    if clips.is_empty() {
        return Err(OrchestratorError::NoAssetsAvailable);
    }
    let picks = segments
        .iter()
        .map(|segment| tag_matcher::best(segment, clips).unwrap_or(0))
        .collect::<Vec<_>>();
    Ok(build_timeline(segments, clips, &picks, max_clips_per_segment))
}

/// Match with one whole-script analysis call.
///
/// Segments the response leaves out, or assigns to a clip that is not in the
/// library, are matched by tags instead. A failed or malformed response
/// degrades every segment. `cause` of the fallback is returned alongside.
pub async fn match_contextual(
    analysis: &dyn TextAnalysisService,
    script: &str,
    segments: &[Segment],
    clips: &[ClipAsset],
    max_clips_per_segment: usize,
) -> OrchestratorResult<(MatchResult, Option<String>)> {
    if clips.is_empty() {
        return Err(OrchestratorError::NoAssetsAvailable);
    }

    let by_id: HashMap<&str, usize> = clips
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.as_str(), i))
        .collect();

    let (chosen, cause): (HashMap<String, usize>, Option<String>) =
        match analysis.match_whole(script, segments, clips).await {
            Ok(choices) => {
                let mut chosen = HashMap::new();
                for choice in choices {
                    if let Some(&idx) = by_id.get(choice.clip_id.as_str()) {
                        // First answer for a segment wins
                        chosen.entry(choice.segment_id).or_insert(idx);
                    }
                }
                (chosen, None)
            }
            Err(e) => (HashMap::new(), Some(e.to_string())),
        };

    let mut missing = Vec::new();
    let picks = segments
        .iter()
        .map(|segment| match chosen.get(&segment.id) {
            Some(&idx) => idx,
            None => {
                missing.push(segment.id.clone());
                tag_matcher::best(segment, clips).unwrap_or(0)
            }
        })
        .collect::<Vec<_>>();

    let assignments = build_timeline(segments, clips, &picks, max_clips_per_segment);
    let result = if missing.is_empty() {
        MatchResult::Full(assignments)
    } else {
        MatchResult::Partial {
            assignments,
            missing_segment_ids: missing,
        }
    };
    let cause = cause.or_else(|| {
        result
            .is_partial()
            .then(|| "response omitted segments or named unknown clips".to_string())
    });
    Ok((result, cause))
}

/// Lay out one assignment per segment, starting each at the cumulative
/// duration of the segments before it.
pub fn build_timeline(
    segments: &[Segment],
    clips: &[ClipAsset],
    picks: &[usize],
    max_clips_per_segment: usize,
) -> Vec<SceneAssignment> {
    let mut position = 0.0;
    segments
        .iter()
        .zip(picks)
        .map(|(segment, &primary)| {
            let assignment = SceneAssignment {
                segment_id: segment.id.clone(),
                clips: fill_slots(segment, clips, primary, max_clips_per_segment),
                start_position_seconds: position,
            };
            position += segment.duration_seconds;
            assignment
        })
        .collect()
}

/// Slots for one segment, starting with `primary`.
///
/// While the current clip is known to be shorter than the time left, it is
/// played in full and the next best unused clip by tag rank follows. The
/// last slot absorbs the remainder so the slots sum to the segment length.
pub fn fill_slots(
    segment: &Segment,
    clips: &[ClipAsset],
    primary: usize,
    max_clips: usize,
) -> Vec<ClipSlot> {
    let max_clips = max_clips.max(1);
    let ranked = tag_matcher::rank(segment, clips);
    let mut used = vec![primary];
    let mut slots = Vec::new();
    let mut remaining = segment.duration_seconds;
    let mut current = primary;

    loop {
        let clip = &clips[current];
        let next = if slots.len() + 1 < max_clips {
            ranked.iter().copied().find(|i| !used.contains(i))
        } else {
            None
        };

        match (clip.duration_seconds, next) {
            (Some(length), Some(next_idx)) if length > EPSILON && length + EPSILON < remaining => {
                slots.push(ClipSlot {
                    clip_id: clip.id.clone(),
                    duration_seconds: length,
                });
                remaining -= length;
                used.push(next_idx);
                current = next_idx;
            }
            _ => {
                slots.push(ClipSlot {
                    clip_id: clip.id.clone(),
                    duration_seconds: remaining,
                });
                return slots;
            }
        }
    }
}
