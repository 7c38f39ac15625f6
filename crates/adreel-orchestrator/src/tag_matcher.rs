//! Keyword/tag overlap scoring.

use std::cmp::Reverse;
use std::collections::HashSet;

use adreel_models::{ClipAsset, Segment};

fn normalized(values: &[String]) -> HashSet<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Number of distinct keywords of `segment` that appear among `clip`'s tags,
/// compared trimmed and case-insensitively.
pub fn score(segment: &Segment, clip: &ClipAsset) -> u32 {
    let keywords = normalized(&segment.keywords);
    let tags = normalized(&clip.tags);
    keywords.intersection(&tags).count() as u32
}

/// Indices into `clips`, best score first. Ties keep library order.
pub fn rank(segment: &Segment, clips: &[ClipAsset]) -> Vec<usize> {
    let keywords = normalized(&segment.keywords);
    let mut scored: Vec<(usize, u32)> = clips
        .iter()
        .enumerate()
        .map(|(i, clip)| {
            let tags = normalized(&clip.tags);
            (i, keywords.intersection(&tags).count() as u32)
        })
        .collect();
    // sort_by_key is stable
    scored.sort_by_key(|(_, s)| Reverse(*s));
    scored.into_iter().map(|(i, _)| i).collect()
}

/// Index of the best clip for `segment`, `None` only for an empty library.
pub fn best(segment: &Segment, clips: &[ClipAsset]) -> Option<usize> {
    rank(segment, clips).first().copied()
}
