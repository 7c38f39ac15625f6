//! Clip assets and scene assignments.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A raw clip in the user's asset library.
///
/// Owned by the asset library; the orchestrator only reads it and refers to
/// it by `id` / `storage_key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipAsset {
    /// Library identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Object store key of the source file
    pub storage_key: String,
    /// Descriptive tags used for matching
    #[serde(default)]
    pub tags: Vec<String>,
    /// Known source length in seconds, if probed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

impl ClipAsset {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        storage_key: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            storage_key: storage_key.into(),
            tags,
            duration_seconds: None,
        }
    }

    /// Set the known source duration.
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }
}

/// One clip placed inside a segment's time slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipSlot {
    pub clip_id: String,
    pub duration_seconds: f64,
}

/// The clips chosen for one segment and where that segment starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SceneAssignment {
    pub segment_id: String,
    /// Clips played back to back within the segment
    pub clips: Vec<ClipSlot>,
    /// Timeline start of the segment in seconds
    pub start_position_seconds: f64,
}

impl SceneAssignment {
    /// Summed duration of all slots.
    pub fn total_duration(&self) -> f64 {
        self.clips.iter().map(|c| c.duration_seconds).sum()
    }

    /// Timeline position where the next segment should start.
    pub fn end_position(&self) -> f64 {
        self.start_position_seconds + self.total_duration()
    }

    /// Clip ids in slot order.
    pub fn clip_ids(&self) -> impl Iterator<Item = &str> {
        self.clips.iter().map(|c| c.clip_id.as_str())
    }
}

/// Indices `i` where assignment `i` does not start where `i - 1` ended.
///
/// An empty result means the scene list forms a contiguous timeline
/// starting at zero.
pub fn timeline_gaps(assignments: &[SceneAssignment], tolerance: f64) -> Vec<usize> {
    let mut gaps = Vec::new();
    let mut expected = 0.0;
    for (i, assignment) in assignments.iter().enumerate() {
        if (assignment.start_position_seconds - expected).abs() > tolerance {
            gaps.push(i);
        }
        expected = assignment.end_position();
    }
    gaps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(id: &str, start: f64, durations: &[f64]) -> SceneAssignment {
        SceneAssignment {
            segment_id: id.to_string(),
            clips: durations
                .iter()
                .enumerate()
                .map(|(i, d)| ClipSlot {
                    clip_id: format!("clip-{}", i),
                    duration_seconds: *d,
                })
                .collect(),
            start_position_seconds: start,
        }
    }

    #[test]
    fn test_contiguous_timeline_has_no_gaps() {
        let scenes = vec![
            assignment("a", 0.0, &[2.0, 1.5]),
            assignment("b", 3.5, &[3.0]),
            assignment("c", 6.5, &[1.0]),
        ];
        assert!(timeline_gaps(&scenes, 1e-6).is_empty());
        assert!((scenes[0].total_duration() - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_gap_and_overlap_detected() {
        let scenes = vec![
            assignment("a", 0.0, &[2.0]),
            assignment("b", 2.5, &[1.0]),
            assignment("c", 3.0, &[1.0]),
        ];
        assert_eq!(timeline_gaps(&scenes, 1e-6), vec![1, 2]);
    }

    #[test]
    fn test_clip_duration_is_optional_on_the_wire() {
        let clip: ClipAsset = serde_json::from_str(
            r#"{"id":"c1","name":"Pour","storage_key":"u/clips/pour.mp4","tags":["coffee"]}"#,
        )
        .unwrap();
        assert_eq!(clip.duration_seconds, None);
        let json = serde_json::to_string(&clip).unwrap();
        assert!(!json.contains("duration_seconds"));
    }
}
