use crate::config::ToolRuleConfig;

/// Forces a tool when the prompt mentions any of the keywords
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRule {
    keywords: Vec<String>,
    tool: String,
}

impl KeywordRule {
    pub fn new<S: AsRef<str>>(keywords: &[S], tool: impl Into<String>) -> Self {
        Self {
            keywords: keywords
                .iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            tool: tool.into(),
        }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// First keyword contained in the lowercased prompt
    fn matched_keyword(&self, lowered_prompt: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|k| lowered_prompt.contains(k.as_str()))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch<'a> {
    pub tool: &'a str,
    pub keyword: &'a str,
}

/// Ordered keyword rules; the first matching rule whose tool is available wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    rules: Vec<KeywordRule>,
}

impl RuleTable {
    pub fn new(rules: Vec<KeywordRule>) -> Self {
        Self { rules }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_config(rules: &[ToolRuleConfig]) -> Self {
        Self::new(
            rules
                .iter()
                .map(|r| KeywordRule::new(&r.keywords, r.tool.clone()))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    pub fn evaluate<F>(&self, prompt: &str, is_available: F) -> Option<RuleMatch<'_>>
    where
        F: Fn(&str) -> bool,
    {
        let lowered = prompt.to_lowercase();
        self.rules.iter().find_map(|rule| {
            let keyword = rule.matched_keyword(&lowered)?;
            if is_available(rule.tool()) {
                Some(RuleMatch {
                    tool: rule.tool(),
                    keyword,
                })
            } else {
                tracing::debug!(tool = rule.tool(), "rule matched but tool is unavailable");
                None
            }
        })
    }
}
