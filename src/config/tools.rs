use serde::{Deserialize, Serialize};

/// A keyword rule that forces a specific tool when any keyword appears in the
/// user's prompt.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ToolRuleConfig {
    pub keywords: Vec<String>,
    pub tool: String,
}

impl ToolRuleConfig {
    pub fn new(keywords: &[&str], tool: &str) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            tool: tool.to_string(),
        }
    }
}
