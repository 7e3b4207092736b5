//! Response payload decoding
//!
//! List and dry-run delete-collection responses are a single `*List`
//! document. Watch responses are newline-delimited event envelopes.

use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
struct WatchEvent {
    #[serde(rename = "type", default)]
    event_type: String,
    #[serde(default)]
    object: Option<Value>,
}

/// Items of a list document.
///
/// Empty bodies and non-list objects (such as a `Status`) hold no items.
pub fn decode_list(bytes: &[u8]) -> Result<Vec<Value>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let doc: Value = serde_json::from_slice(bytes)
        .map_err(|e| Error::MalformedResponse(format!("invalid list document: {}", e)))?;

    match doc.get("items") {
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(other) => Err(Error::MalformedResponse(format!(
            "list items is not an array: {}",
            type_name(other)
        ))),
    }
}

/// Objects carried by a watch event stream.
///
/// `ERROR` and `BOOKMARK` events carry no resource object and are dropped.
pub fn decode_watch(bytes: &[u8]) -> Result<Vec<Value>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::MalformedResponse(format!("watch stream is not utf-8: {}", e)))?;

    let mut objects = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event: WatchEvent = serde_json::from_str(line).map_err(|e| {
            Error::MalformedResponse(format!("invalid watch event on line {}: {}", line_no + 1, e))
        })?;

        if matches!(event.event_type.as_str(), "ERROR" | "BOOKMARK") {
            continue;
        }
        if let Some(object @ Value::Object(_)) = event.object {
            objects.push(object);
        }
    }

    Ok(objects)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
