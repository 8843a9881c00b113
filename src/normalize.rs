//! Status normalization
//!
//! Translates a provider's raw status payload into a [`GenerationTask`]
//! snapshot. Each provider supplies a fixed [`StatusRule`] table and the
//! field paths where status, progress, result and error live.
//!
//! [`normalize`] is total: missing or malformed fields degrade to
//! placeholders so callers always get a well-formed snapshot.

use crate::models::{CanonicalStatus, GenerationTask, TaskState};
use serde_json::Value;

pub const UNKNOWN_ERROR: &str = "Unknown error";

/// One entry of a provider's status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusRule {
    pub raw: &'static str,
    pub status: CanonicalStatus,
    /// Used when the payload carries no numeric progress of its own.
    pub progress: Option<u8>,
}

const fn rule(raw: &'static str, status: CanonicalStatus, progress: Option<u8>) -> StatusRule {
    StatusRule {
        raw,
        status,
        progress,
    }
}

/// Prediction-style vocabulary (`starting` / `processing` / `succeeded` / `failed`).
pub const PREDICTION_STATUSES: &[StatusRule] = &[
    rule("starting", CanonicalStatus::Pending, Some(0)),
    rule("processing", CanonicalStatus::InProgress, Some(50)),
    rule("succeeded", CanonicalStatus::Succeeded, Some(100)),
    rule("failed", CanonicalStatus::Failed, Some(0)),
    rule("canceled", CanonicalStatus::Failed, Some(0)),
];

/// Vocabulary that already matches the canonical one; progress comes from
/// the payload.
pub const CANONICAL_STATUSES: &[StatusRule] = &[
    rule("PENDING", CanonicalStatus::Pending, Some(0)),
    rule("IN_PROGRESS", CanonicalStatus::InProgress, None),
    rule("SUCCEEDED", CanonicalStatus::Succeeded, Some(100)),
    rule("FAILED", CanonicalStatus::Failed, None),
    rule("TIMEOUT", CanonicalStatus::Timeout, None),
    rule("CANCELED", CanonicalStatus::Failed, None),
    rule("EXPIRED", CanonicalStatus::Failed, None),
];

/// Where a provider keeps each piece of its status payload.
///
/// Paths are dot-separated; numeric segments index into arrays
/// (`task_error.message`, `data.0.url`).
#[derive(Debug, Clone, PartialEq)]
pub struct StatusContract {
    pub table: &'static [StatusRule],
    pub status_field: String,
    pub progress_field: Option<String>,
    pub result_field: String,
    pub error_field: String,
    pub source_image_field: Option<String>,
}

/// Resolve a dot-separated path inside a JSON value.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn find_rule(table: &[StatusRule], raw: &str) -> Option<StatusRule> {
    table
        .iter()
        .find(|rule| rule.raw.eq_ignore_ascii_case(raw.trim()))
        .copied()
}

fn reported_progress(raw: &Value, contract: &StatusContract) -> Option<u8> {
    let field = contract.progress_field.as_deref()?;
    let progress = lookup(raw, field)?.as_f64()?;
    if !progress.is_finite() {
        return None;
    }
    Some(progress.clamp(0.0, 100.0).round() as u8)
}

/// Pick a model URL out of a result field.
///
/// Accepts a bare string, a sequence (first element wins), or an object
/// keyed by format.
pub fn extract_result_url(value: &Value) -> Option<String> {
    match value {
        Value::String(url) => {
            let url = url.trim();
            (!url.is_empty()).then(|| url.to_string())
        }
        Value::Array(items) => items.first().and_then(extract_result_url),
        Value::Object(map) => ["glb", "mesh", "url"]
            .iter()
            .find_map(|key| map.get(*key).and_then(extract_result_url)),
        _ => None,
    }
}

fn extract_error(raw: &Value, contract: &StatusContract) -> String {
    let message = match lookup(raw, &contract.error_field) {
        Some(Value::String(message)) => Some(message.trim().to_string()),
        Some(Value::Object(map)) => map
            .get("message")
            .and_then(Value::as_str)
            .map(|m| m.trim().to_string()),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    };
    message
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
}

/// Build a canonical snapshot from a raw provider status payload.
pub fn normalize(task_id: &str, raw: &Value, contract: &StatusContract) -> GenerationTask {
    let raw_status = lookup(raw, &contract.status_field).and_then(Value::as_str);

    let matched = match raw_status.and_then(|s| find_rule(contract.table, s)) {
        Some(found) => found,
        None => {
            tracing::debug!(
                "Task {}: unrecognized provider status {:?}, treating as pending",
                task_id,
                raw_status
            );
            rule("", CanonicalStatus::Pending, Some(0))
        }
    };

    let progress = reported_progress(raw, contract)
        .or(matched.progress)
        .unwrap_or(0);

    let state = match matched.status {
        CanonicalStatus::Pending => TaskState::Pending,
        CanonicalStatus::InProgress => TaskState::InProgress,
        CanonicalStatus::Succeeded => {
            match lookup(raw, &contract.result_field).and_then(extract_result_url) {
                Some(result_url) => TaskState::Succeeded { result_url },
                None => {
                    tracing::warn!("Task {}: provider reported success without a model URL", task_id);
                    TaskState::Failed {
                        error: "Provider reported success but returned no model URL".to_string(),
                    }
                }
            }
        }
        CanonicalStatus::Failed => TaskState::Failed {
            error: extract_error(raw, contract),
        },
        CanonicalStatus::Timeout => TaskState::TimedOut {
            error: extract_error(raw, contract),
        },
    };

    let source_image_url = contract
        .source_image_field
        .as_deref()
        .and_then(|field| lookup(raw, field))
        .and_then(Value::as_str)
        .map(str::to_string);

    GenerationTask::new(task_id, state, progress).with_source_image_url(source_image_url)
}
