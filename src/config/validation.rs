use regex::Regex;
use std::collections::BTreeMap;
use std::env;
use std::sync::OnceLock;

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static pattern compiles"))
}

/// Expand environment variables in a string using ${VAR_NAME} syntax.
/// Unset variables are left untouched.
pub fn expand_env_var_in_string(value: &str) -> String {
    let mut result = value.to_string();

    for cap in env_var_pattern().captures_iter(value) {
        let var_name = &cap[1];
        let replacement = env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name));
        result = result.replace(&cap[0], &replacement);
    }

    result
}

/// Expand environment variables in every value of a map
pub fn expand_env_vars(values: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    values
        .iter()
        .map(|(key, value)| (key.clone(), expand_env_var_in_string(value)))
        .collect()
}

/// Parse the truthy spellings accepted by environment overrides
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_set_variables_and_keeps_unset_ones() {
        env::set_var("HKUBE_MCP_TEST_HOST", "h.example");
        let expanded =
            expand_env_var_in_string("https://${HKUBE_MCP_TEST_HOST}/${HKUBE_MCP_TEST_UNSET}");
        assert_eq!(expanded, "https://h.example/${HKUBE_MCP_TEST_UNSET}");
    }

    #[test]
    fn parses_flags() {
        assert_eq!(parse_flag("YES"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
