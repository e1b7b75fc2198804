use jsonschema::JSONSchema;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::OnceLock;

use crate::normalize::first_json_object;

const DECISION_INSTRUCTION: &str = "You are an assistant that decides whether to call MCP tools.\n\
If a tool is needed to answer the user's request, reply with a JSON object only, without extra text, in the form:\n\
{\"use_tool\": true, \"tool_name\": \"<toolname>\", \"tool_prompt\": \"<prompt for the tool>\"}\n\
If no tool is necessary, reply with: {\"use_tool\": false}.";

/// The model's answer to "should a tool be used?"
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolDecision {
    pub use_tool: bool,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_prompt: Option<Value>,
}

impl ToolDecision {
    /// Tool name, if one was given and is not blank
    pub fn tool(&self) -> Option<&str> {
        self.tool_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// The tool prompt as plain text
    pub fn prompt_text(&self) -> String {
        match &self.tool_prompt {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Tool arguments carried by the prompt. A JSON object with `args` or
    /// `kwargs` is used as the envelope, any other object as keyword values.
    /// Free text carries no arguments.
    pub fn arguments(&self) -> Option<Value> {
        let value = match &self.tool_prompt {
            Some(Value::String(s)) => serde_json::from_str::<Value>(s).ok()?,
            Some(other) => other.clone(),
            None => return None,
        };
        match value {
            Value::Object(map) if map.contains_key("args") || map.contains_key("kwargs") => {
                Some(Value::Object(map))
            }
            Value::Object(map) if map.is_empty() => None,
            Value::Object(map) => {
                let mut envelope = Map::new();
                envelope.insert("kwargs".to_string(), Value::Object(map));
                Some(Value::Object(envelope))
            }
            _ => None,
        }
    }
}

fn decision_schema() -> Value {
    json!({
        "type": "object",
        "required": ["use_tool"],
        "properties": {
            "use_tool": { "type": "boolean" },
            "tool_name": { "type": ["string", "null"] },
            "tool_prompt": {}
        }
    })
}

/// Full prompt for the decision request
pub fn build_decision_prompt(user_prompt: &str, catalog: Option<&str>) -> String {
    let mut prompt = DECISION_INSTRUCTION.to_string();
    if let Some(catalog) = catalog.filter(|c| !c.trim().is_empty()) {
        prompt.push_str("\nAvailable tools:\n");
        prompt.push_str(catalog);
        prompt.push('\n');
    }
    prompt.push_str("\nUser: ");
    prompt.push_str(user_prompt);
    prompt
}

/// Prompt asking for the final answer given the tool's output
pub fn build_followup_prompt(tool_output: &str, user_prompt: &str) -> String {
    format!(
        "The tool returned:\n{}\nUsing that, please answer the original user request: {}",
        tool_output, user_prompt
    )
}

/// Parse the model's decision text. The whole text is tried first, then the
/// first JSON object embedded in it; the result must match the decision
/// schema.
pub fn parse_decision(raw: &str) -> Option<ToolDecision> {
    let candidate = match serde_json::from_str::<Value>(raw.trim()) {
        Ok(value @ Value::Object(_)) => value,
        _ => first_json_object(raw)?,
    };

    if let Some(compiled) = compiled_decision_schema() {
        if let Err(errors) = compiled.validate(&candidate) {
            let messages: Vec<String> = errors
                .map(|e| format!("{}: {}", e.instance_path, e))
                .collect();
            tracing::debug!(errors = %messages.join("; "), "decision does not match schema");
            return None;
        }
    }

    serde_json::from_value(candidate).ok()
}

/// Compiled once per process; `None` if compilation failed, in which case
/// decisions are not validated.
fn compiled_decision_schema() -> Option<&'static JSONSchema> {
    static COMPILED: OnceLock<Option<JSONSchema>> = OnceLock::new();
    COMPILED
        .get_or_init(|| {
            let schema = decision_schema();
            match JSONSchema::compile(&schema) {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "decision schema failed to compile; skipping validation"
                    );
                    None
                }
            }
        })
        .as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pure_json() {
        let decision = parse_decision(
            r#"{"use_tool": true, "tool_name": "list_algorithms", "tool_prompt": ""}"#,
        )
        .unwrap();
        assert!(decision.use_tool);
        assert_eq!(decision.tool(), Some("list_algorithms"));
    }

    #[test]
    fn extracts_object_after_prose() {
        let raw = "Sure! Here is my decision:\n{\"use_tool\": false}\nThanks.";
        assert_eq!(
            parse_decision(raw),
            Some(ToolDecision {
                use_tool: false,
                tool_name: None,
                tool_prompt: None
            })
        );
    }

    #[test]
    fn rejects_wrong_shapes() {
        assert!(parse_decision("no json at all").is_none());
        assert!(parse_decision(r#"{"use_tool": "yes"}"#).is_none());
        assert!(parse_decision(r#"{"tool_name": "x"}"#).is_none());
    }

    #[test]
    fn schema_is_compiled_once_and_reused() {
        let first = compiled_decision_schema().expect("decision schema compiles");
        let second = compiled_decision_schema().expect("decision schema compiles");
        assert!(std::ptr::eq(first, second));

        for _ in 0..3 {
            assert!(parse_decision(r#"{"use_tool": false}"#).is_some());
            assert!(parse_decision(r#"{"use_tool": "yes"}"#).is_none());
        }
    }

    #[test]
    fn blank_tool_name_is_absent() {
        let decision = parse_decision(r#"{"use_tool": true, "tool_name": "  "}"#).unwrap();
        assert_eq!(decision.tool(), None);
    }

    #[test]
    fn prompt_arguments() {
        let object = parse_decision(
            r#"{"use_tool": true, "tool_name": "search_jobs_tool", "tool_prompt": {"pipeline_name": "simple"}}"#,
        )
        .unwrap();
        assert_eq!(
            object.arguments(),
            Some(json!({"kwargs": {"pipeline_name": "simple"}}))
        );

        let envelope = parse_decision(
            r#"{"use_tool": true, "tool_name": "read_resource", "tool_prompt": "{\"args\": [\"guide\"]}"}"#,
        )
        .unwrap();
        assert_eq!(envelope.arguments(), Some(json!({"args": ["guide"]})));

        let text = parse_decision(
            r#"{"use_tool": true, "tool_name": "list_algorithms", "tool_prompt": "list them all"}"#,
        )
        .unwrap();
        assert_eq!(text.arguments(), None);
        assert_eq!(text.prompt_text(), "list them all");
    }

    #[test]
    fn decision_prompt_layout() {
        let prompt = build_decision_prompt("list the algorithms", Some("list_algorithms: x"));
        assert!(prompt.starts_with("You are an assistant that decides whether to call MCP tools."));
        assert!(prompt.contains("\nAvailable tools:\nlist_algorithms: x\n"));
        assert!(prompt.ends_with("\nUser: list the algorithms"));
    }

    #[test]
    fn followup_prompt_layout() {
        assert_eq!(
            build_followup_prompt("[1,2]", "list"),
            "The tool returned:\n[1,2]\nUsing that, please answer the original user request: list"
        );
    }
}
