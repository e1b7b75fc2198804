//! Best-effort parsing of HTTP and model response bodies that may or may not
//! be JSON.

use serde_json::{Deserializer, Value};

/// Turn response text into the most structured value it supports.
///
/// In order: one JSON document; newline-delimited JSON (a list, or the bare
/// value when there is exactly one line); the first JSON object or array
/// embedded in surrounding noise; the original text as a JSON string.
/// Never fails.
pub fn normalize(text: &str) -> Value {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return value;
    }

    if let Some(value) = parse_ndjson(text) {
        return value;
    }

    if let Some(value) = first_embedded_value(text, |_| true) {
        return value;
    }

    Value::String(text.to_string())
}

/// Every non-blank line must parse; otherwise this step does not apply.
fn parse_ndjson(text: &str) -> Option<Value> {
    let mut values = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(serde_json::from_str::<Value>)
        .collect::<Result<Vec<_>, _>>()
        .ok()?;

    match values.len() {
        0 => None,
        1 => values.pop(),
        _ => Some(Value::Array(values)),
    }
}

/// First JSON object embedded anywhere in `text`.
pub fn first_json_object(text: &str) -> Option<Value> {
    first_embedded_value(text, Value::is_object)
}

/// Scan every `{` / `[` position for a complete JSON value, ignoring whatever
/// follows it. `accept` filters candidates.
fn first_embedded_value(text: &str, accept: impl Fn(&Value) -> bool) -> Option<Value> {
    for (start, ch) in text.char_indices() {
        if ch != '{' && ch != '[' {
            continue;
        }
        let mut stream = Deserializer::from_str(&text[start..]).into_iter::<Value>();
        if let Some(Ok(value)) = stream.next() {
            if accept(&value) {
                return Some(value);
            }
        }
    }
    None
}

/// Render a normalized value as tool output text: strings verbatim, anything
/// else as compact JSON.
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
