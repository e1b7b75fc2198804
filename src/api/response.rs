use serde_json::Value;

/// Text of a non-streaming generation body: the `response` field when
/// present, a bare JSON string as-is, other JSON pretty-printed, and
/// anything else verbatim.
pub fn extract_response_text(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("response") {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => pretty(&Value::Object(map)),
        },
        Ok(Value::String(text)) => text,
        Ok(other) => pretty(&other),
        Err(_) => body.to_string(),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
