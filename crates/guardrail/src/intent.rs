//! Structured intent extraction
//!
//! The engine is instructed to answer with a JSON `{intent, text}` record as
//! the text content of each conversational turn. Where that text lives in
//! the payload depends on the engine version, so lookup is tolerant.

use serde_json::Value;

use callbridge_core::ExtractedIntent;

use crate::GuardrailError;

/// Locate the turn's text content inside an engine payload.
///
/// Scans `item.content[].text` (then `.transcript`), falling back to a
/// top-level `text` field; the first string found wins.
pub fn item_text(raw: &Value) -> Option<String> {
    let item = raw.get("item").unwrap_or(raw);

    if let Some(content) = item.get("content").and_then(Value::as_array) {
        for part in content {
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                return Some(text.to_string());
            }
            if let Some(text) = part.get("transcript").and_then(Value::as_str) {
                return Some(text.to_string());
            }
        }
    }

    item.get("text").and_then(Value::as_str).map(str::to_owned)
}

/// Parse the structured `{intent, text}` record out of a turn payload.
pub fn extract(raw: &Value) -> Result<ExtractedIntent, GuardrailError> {
    let text = item_text(raw).ok_or(GuardrailError::MissingText)?;
    serde_json::from_str::<ExtractedIntent>(text.trim())
        .map_err(|e| GuardrailError::Malformed(e.to_string()))
}
