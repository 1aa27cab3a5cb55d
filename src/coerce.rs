//! Code-fence stripping and JSON coercion of model output.

use crate::error::FlowError;
use serde_json::Value;

/// Strip one leading/trailing markdown code fence, if present.
///
/// The opening fence may carry a language tag (```` ```json ````); text
/// without fences passes through unchanged apart from trimming, so the
/// operation is idempotent.
pub fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let mut lines: Vec<&str> = trimmed.lines().collect();
    if let Some(first) = lines.first() {
        if first.trim_start().starts_with("```") {
            lines.remove(0);
        }
    }
    if let Some(last) = lines.last() {
        if last.trim_start().starts_with("```") {
            lines.pop();
        }
    }
    lines.join("\n").trim().to_string()
}

/// Parse model output text as a JSON document, tolerating a fence wrapper.
///
/// A parse failure keeps the fence-stripped payload in the error so the
/// offending response is never discarded.
pub fn coerce_json(raw: &str) -> Result<Value, FlowError> {
    let cleaned = strip_code_fences(raw);
    serde_json::from_str(&cleaned).map_err(|err| {
        FlowError::parse(format!("model output is not valid JSON: {err}"), cleaned)
    })
}
