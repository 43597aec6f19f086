//! JSON parsing helpers for model responses
//!
//! Models often wrap the JSON payload in prose, so extraction falls back to
//! the first `{` when the whole reply does not parse.

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::models::{Insight, InsightBatch, Severity};

/// Longest title accepted from a model
pub const MAX_TITLE_CHARS: usize = 128;

pub const EMPTY_INSIGHTS_TITLE: &str = "No critical issues detected";
pub const EMPTY_INSIGHTS_DETAIL: &str =
    "Consider shifting flexible plug loads to 22:00–06:00 and turning off long-on lights.";

/// Extract a JSON object from a model reply.
///
/// The reply is parsed as a whole first; failing that, everything from the
/// first `{` onward is parsed. Anything other than an object is an error.
pub fn extract_json_object(response: &str) -> Result<Map<String, Value>> {
    let response = response.trim();

    let value = match serde_json::from_str::<Value>(response) {
        Ok(value) => value,
        Err(_) => {
            let start = response.find('{').ok_or_else(|| {
                Error::InvalidData(format!(
                    "No JSON found in AI response | Raw: {}",
                    truncate_chars(response, 200)
                ))
            })?;
            serde_json::from_str(&response[start..]).map_err(|e| {
                Error::InvalidData(format!(
                    "Invalid JSON from AI: {} | Raw: {}",
                    e,
                    truncate_chars(&response[start..], 200)
                ))
            })?
        }
    };

    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidData(format!(
            "Expected a JSON object from AI, got: {}",
            truncate_chars(&other.to_string(), 200)
        ))),
    }
}

/// Parse an insights reply into a sanitized batch.
///
/// A reply whose `insights` key is missing, not a list, or empty yields a
/// single informational insight. Each item is cleaned: severity clamped,
/// title defaulted when absent and truncated, detail defaulted. A title that
/// is present but not a string is an error.
pub fn parse_insights_response(response: &str) -> Result<InsightBatch> {
    let object = extract_json_object(response)?;

    let items = match object.get("insights") {
        Some(Value::Array(items)) if !items.is_empty() => items,
        _ => {
            return Ok(vec![Insight::new(
                Severity::Info,
                EMPTY_INSIGHTS_TITLE,
                EMPTY_INSIGHTS_DETAIL,
            )])
        }
    };

    items.iter().map(clean_insight).collect()
}

fn clean_insight(item: &Value) -> Result<Insight> {
    let item = item
        .as_object()
        .ok_or_else(|| Error::InvalidData(format!("Insight item is not an object: {}", item)))?;

    let severity = Severity::clamp(item.get("severity").and_then(Value::as_str));
    let title = match item.get("title") {
        None => "Insight".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            return Err(Error::InvalidData(format!(
                "Insight title is not a string: {}",
                other
            )))
        }
    };
    let detail = text_field(item.get("detail")).unwrap_or_default();

    Ok(Insight::new(
        severity,
        truncate_chars(&title, MAX_TITLE_CHARS),
        detail,
    ))
}

/// Strings verbatim, other non-null values stringified
fn text_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Truncate to at most `max` characters (not bytes)
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
