//! Segment planning: one analysis call, then local normalization.

use adreel_llm_client::{SegmentDraft, TextAnalysisService};
use adreel_models::{Segment, SegmentConstraints};
use tracing::debug;

use crate::error::{OrchestratorError, OrchestratorResult};

/// Tolerance when comparing durations against constraint bounds.
const EPSILON: f64 = 1e-9;

/// Plan timed segments for `script`.
///
/// Calls the analysis service exactly once. Any failure, including a
/// malformed or empty result, is `PlanningFailed`; nothing is retried here.
pub async fn plan(
    analysis: &dyn TextAnalysisService,
    script: &str,
    constraints: &SegmentConstraints,
) -> OrchestratorResult<Vec<Segment>> {
    if script.trim().is_empty() {
        return Err(OrchestratorError::invalid_input("script is empty"));
    }
    constraints
        .validate()
        .map_err(|e| OrchestratorError::invalid_input(e.to_string()))?;

    let drafts = analysis
        .analyze(script, constraints)
        .await
        .map_err(|e| OrchestratorError::planning_failed(e.to_string()))?;

    normalize(drafts, constraints)
}

/// Validate, merge, split and number raw drafts.
pub fn normalize(
    drafts: Vec<SegmentDraft>,
    constraints: &SegmentConstraints,
) -> OrchestratorResult<Vec<Segment>> {
    if drafts.is_empty() {
        return Err(OrchestratorError::planning_failed(
            "analysis returned no segments",
        ));
    }
    for (i, draft) in drafts.iter().enumerate() {
        validate_draft(i, draft)?;
    }

    let merged = merge_short(drafts, constraints.min_seconds);
    let split: Vec<SegmentDraft> = merged
        .into_iter()
        .flat_map(|d| split_long(d, constraints))
        .collect();

    debug!(segments = split.len(), "Normalized segment drafts");

    Ok(split
        .into_iter()
        .enumerate()
        .map(|(i, d)| Segment::new(format!("seg-{}", i + 1), d.text, d.duration_seconds, d.keywords))
        .collect())
}

fn validate_draft(index: usize, draft: &SegmentDraft) -> OrchestratorResult<()> {
    if draft.text.trim().is_empty() {
        return Err(OrchestratorError::planning_failed(format!(
            "segment {} has empty text",
            index + 1
        )));
    }
    if !draft.duration_seconds.is_finite() || draft.duration_seconds <= 0.0 {
        return Err(OrchestratorError::planning_failed(format!(
            "segment {} has invalid duration {}",
            index + 1,
            draft.duration_seconds
        )));
    }
    Ok(())
}

fn join(mut first: SegmentDraft, second: SegmentDraft) -> SegmentDraft {
    first.text = format!("{} {}", first.text.trim(), second.text.trim());
    first.duration_seconds += second.duration_seconds;
    for keyword in second.keywords {
        let seen = first
            .keywords
            .iter()
            .any(|k| k.trim().eq_ignore_ascii_case(keyword.trim()));
        if !seen {
            first.keywords.push(keyword);
        }
    }
    first
}

/// Short drafts are folded into the following one; a short tail is folded
/// into its predecessor. A lone short draft stays as is.
fn merge_short(drafts: Vec<SegmentDraft>, min_seconds: f64) -> Vec<SegmentDraft> {
    let mut merged: Vec<SegmentDraft> = Vec::with_capacity(drafts.len());
    let mut carry: Option<SegmentDraft> = None;

    for draft in drafts {
        let draft = match carry.take() {
            Some(pending) => join(pending, draft),
            None => draft,
        };
        if draft.duration_seconds + EPSILON < min_seconds {
            carry = Some(draft);
        } else {
            merged.push(draft);
        }
    }

    if let Some(tail) = carry {
        match merged.pop() {
            Some(previous) => merged.push(join(previous, tail)),
            None => merged.push(tail),
        }
    }
    merged
}

/// Split into equal-duration word chunks when too long or too wordy.
///
/// With fewer words than pieces, neighbouring pieces share a word.
fn split_long(draft: SegmentDraft, constraints: &SegmentConstraints) -> Vec<SegmentDraft> {
    let words: Vec<&str> = draft.text.split_whitespace().collect();
    let by_duration = ((draft.duration_seconds / constraints.max_seconds) - EPSILON).ceil() as usize;
    let max_words = constraints.max_words_per_segment.max(1);
    let by_words = words.len().div_ceil(max_words);
    let pieces = by_duration.max(by_words).max(1);

    if pieces == 1 || words.is_empty() {
        return vec![draft];
    }

    let duration = draft.duration_seconds / pieces as f64;
    let base = words.len() / pieces;
    let extra = words.len() % pieces;

    let mut chunks = Vec::with_capacity(pieces);
    let mut offset = 0;
    for i in 0..pieces {
        let text = if base == 0 {
            words[i * words.len() / pieces].to_string()
        } else {
            let len = base + usize::from(i < extra);
            let text = words[offset..offset + len].join(" ");
            offset += len;
            text
        };
        chunks.push(SegmentDraft {
            text,
            duration_seconds: duration,
            keywords: draft.keywords.clone(),
        });
    }
    chunks
}
