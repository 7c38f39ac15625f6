//! Narration segments and planning constraints.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// A timed chunk of narration text with visual keyword hints.
///
/// Segments are produced once per planning run and are immutable afterward.
/// Their order is the array order on the owning project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Segment {
    /// Identifier, unique within the owning project
    pub id: String,
    /// Narration text spoken during this segment
    pub text: String,
    /// Narration duration in seconds
    pub duration_seconds: f64,
    /// Visual keyword hints used for clip matching
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Segment {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        duration_seconds: f64,
        keywords: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            duration_seconds,
            keywords,
        }
    }

    /// Number of whitespace-separated words in the narration text.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Granularity constraints applied by the segment planner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentConstraints {
    /// Segments shorter than this are merged into a neighbour
    pub min_seconds: f64,
    /// Segments longer than this are split
    pub max_seconds: f64,
    /// Segments with more words than this are split
    #[serde(default = "default_max_words")]
    pub max_words_per_segment: usize,
}

fn default_max_words() -> usize {
    25
}

impl Default for SegmentConstraints {
    fn default() -> Self {
        Self {
            min_seconds: 2.0,
            max_seconds: 8.0,
            max_words_per_segment: default_max_words(),
        }
    }
}

impl SegmentConstraints {
    pub fn new(min_seconds: f64, max_seconds: f64) -> Self {
        Self {
            min_seconds,
            max_seconds,
            ..Default::default()
        }
    }

    /// Check that the constraints describe a usable range.
    pub fn validate(&self) -> ModelResult<()> {
        if !self.min_seconds.is_finite() || self.min_seconds <= 0.0 {
            return Err(ModelError::invalid_constraints("min_seconds must be positive"));
        }
        if !self.max_seconds.is_finite() || self.max_seconds <= 0.0 {
            return Err(ModelError::invalid_constraints("max_seconds must be positive"));
        }
        if self.min_seconds > self.max_seconds {
            return Err(ModelError::invalid_constraints(format!(
                "min_seconds ({}) exceeds max_seconds ({})",
                self.min_seconds, self.max_seconds
            )));
        }
        if self.max_words_per_segment == 0 {
            return Err(ModelError::invalid_constraints(
                "max_words_per_segment must be at least 1",
            ));
        }
        Ok(())
    }
}
