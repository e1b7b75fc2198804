use std::path::PathBuf;

use super::tools::ToolRuleConfig;

pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

pub fn default_model() -> String {
    "gpt-oss:20b".to_string()
}

pub fn default_assistant_name() -> String {
    "hkube".to_string()
}

pub fn default_generate_url() -> String {
    "http://localhost:11434".to_string()
}

pub fn default_resources_dir() -> PathBuf {
    PathBuf::from("resources")
}

pub fn default_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}

pub fn default_tool_timeout() -> u64 {
    30
}

pub fn default_tool_rules() -> Vec<ToolRuleConfig> {
    vec![ToolRuleConfig::new(
        &["algorithm", "algorithms"],
        "list_algorithms",
    )]
}
