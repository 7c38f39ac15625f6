//! Job parameter merging and size-budgeted packing.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use tracing::{debug, warn};

/// Keys the orchestrator sets itself; callers can never override them.
pub const RESERVED_KEYS: &[&str] = &[
    "JOB_TYPE",
    "USER_ID",
    "PROJECT_ID",
    "RUN_ID",
    "OUTPUT_KEY",
    "RENDER_SPEC",
    "RENDER_SPEC_KEY",
];

/// Keys that survive packing no matter the budget.
pub const ESSENTIAL_KEYS: &[&str] = RESERVED_KEYS;

/// Drop order for non-essential keys: lower goes first. Unknown keys are 0.
const PRIORITY_TABLE: &[(&str, u8)] = &[
    ("CALLBACK_URL", 3),
    ("OUTPUT_FORMAT", 3),
    ("OUTPUT_WIDTH", 3),
    ("OUTPUT_HEIGHT", 3),
    ("OUTPUT_FPS", 3),
    ("QUALITY", 2),
    ("VOICEOVER_KEY", 2),
    ("TIMEOUT_SECONDS", 2),
    ("LOG_LEVEL", 1),
    ("TRACE_ID", 1),
    ("REQUEST_ID", 1),
];

pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.iter().any(|r| r.eq_ignore_ascii_case(key.trim()))
}

fn is_essential(key: &str) -> bool {
    ESSENTIAL_KEYS.iter().any(|e| e.eq_ignore_ascii_case(key.trim()))
}

fn priority(key: &str) -> u8 {
    PRIORITY_TABLE
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key.trim()))
        .map(|(_, p)| *p)
        .unwrap_or(0)
}

/// Remove reserved keys (case-insensitive) from caller-supplied parameters.
pub fn filter_reserved(extra: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    extra
        .iter()
        .filter(|(k, _)| {
            let reserved = is_reserved(k);
            if reserved {
                debug!(key = %k, "Dropping reserved key from extra parameters");
            }
            !reserved
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Merge extra parameters with required ones; required values are applied last.
pub fn merge_parameters(
    extra: &BTreeMap<String, String>,
    required: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = filter_reserved(extra);
    merged.extend(required);
    merged
}

/// Size of a parameter map: total bytes of all keys and values.
pub fn param_bytes(params: &BTreeMap<String, String>) -> usize {
    params.iter().map(|(k, v)| k.len() + v.len()).sum()
}

/// Result of fitting parameters into a byte budget.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedParameters {
    pub parameters: BTreeMap<String, String>,
    /// Keys removed to fit, in drop order
    pub dropped: Vec<String>,
    /// Essential keys alone exceed the budget
    pub over_budget: bool,
}

/// Fit `params` under `max_bytes`.
///
/// Non-essential keys are dropped lowest priority first, and largest first
/// within a priority. Essential keys are always kept; if they alone do not
/// fit, the result is flagged `over_budget`.
pub fn pack_parameters(params: BTreeMap<String, String>, max_bytes: usize) -> PackedParameters {
    let mut parameters = params;
    let mut dropped = Vec::new();

    if param_bytes(&parameters) < max_bytes {
        return PackedParameters {
            parameters,
            dropped,
            over_budget: false,
        };
    }

    let mut candidates: Vec<(String, u8, usize)> = parameters
        .iter()
        .filter(|(k, _)| !is_essential(k))
        .map(|(k, v)| (k.clone(), priority(k), k.len() + v.len()))
        .collect();
    candidates.sort_by_key(|(k, p, size)| (*p, Reverse(*size), k.clone()));

    let mut size = param_bytes(&parameters);
    for (key, _, entry_size) in candidates {
        if size < max_bytes {
            break;
        }
        parameters.remove(&key);
        size -= entry_size;
        dropped.push(key);
    }

    let over_budget = size >= max_bytes;
    if over_budget {
        warn!(
            size,
            max_bytes, "Essential job parameters exceed the size budget; submitting anyway"
        );
    } else if !dropped.is_empty() {
        warn!(dropped = ?dropped, "Dropped job parameters to fit the size budget");
    }

    PackedParameters {
        parameters,
        dropped,
        over_budget,
    }
}
