mod defaults;
mod tools;
mod validation;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub use defaults::DEFAULT_CONFIG_FILE;
pub use tools::ToolRuleConfig;
pub use validation::{expand_env_var_in_string, expand_env_vars, parse_flag};

use defaults::{
    default_assistant_name, default_generate_url, default_logs_dir, default_model,
    default_resources_dir, default_tool_rules, default_tool_timeout,
};

/// Process configuration. Loaded once at startup and handed to whatever needs it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub hkube_api_url: Option<String>,
    #[serde(default)]
    pub api_paths: BTreeMap<String, String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub server_path: Option<String>,
    #[serde(default = "default_generate_url")]
    pub generate_url: String,
    #[serde(default = "default_resources_dir")]
    pub resources_dir: PathBuf,
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
    #[serde(default = "default_tool_rules")]
    pub tool_rules: Vec<ToolRuleConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hkube_api_url: None,
            api_paths: BTreeMap::new(),
            model: default_model(),
            assistant_name: default_assistant_name(),
            debug: false,
            server_path: None,
            generate_url: default_generate_url(),
            resources_dir: default_resources_dir(),
            logs_dir: default_logs_dir(),
            tool_timeout_secs: default_tool_timeout(),
            tool_rules: default_tool_rules(),
        }
    }
}

impl Config {
    /// Load the configuration file, failing if none can be found.
    ///
    /// An explicit path wins, then `HKUBE_MCP_CONFIG`, then the search paths.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match Self::locate(explicit)? {
            Some(path) => Self::from_file(&path),
            None => bail!(
                "No configuration file found (looked in {})",
                Self::get_config_paths()
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    /// Like [`Config::load`] but falls back to defaults when no file exists.
    /// A file that exists but cannot be parsed is still an error.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        match Self::locate(explicit)? {
            Some(path) => Self::from_file(&path),
            None => {
                let mut config = Config::default();
                config.apply_env_overrides();
                Ok(config)
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::from_yaml(&contents)
            .with_context(|| format!("Failed to parse YAML config file: {}", path.display()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse a YAML document; an empty document yields the defaults.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Config::default());
        }
        let mut config: Config = serde_yaml::from_str(contents)?;
        config.expand_env();
        Ok(config)
    }

    fn locate(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            return Ok(Some(path.to_path_buf()));
        }

        if let Ok(from_env) = env::var("HKUBE_MCP_CONFIG") {
            let path = PathBuf::from(from_env);
            if !path.exists() {
                bail!(
                    "Config file from HKUBE_MCP_CONFIG not found: {}",
                    path.display()
                );
            }
            return Ok(Some(path));
        }

        Ok(Self::get_config_paths().into_iter().find(|p| p.exists()))
    }

    pub fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from(DEFAULT_CONFIG_FILE),
            PathBuf::from("config.yml"),
        ];

        if let Some(home_dir) = dirs::home_dir() {
            let config_dir = home_dir.join(".config").join("hkube-mcp");
            paths.push(config_dir.join("config.yaml"));
            paths.push(config_dir.join("config.yml"));
        }

        paths
    }

    fn expand_env(&mut self) {
        self.hkube_api_url = self
            .hkube_api_url
            .as_deref()
            .map(expand_env_var_in_string);
        self.api_paths = expand_env_vars(&self.api_paths);
        self.model = expand_env_var_in_string(&self.model);
        self.generate_url = expand_env_var_in_string(&self.generate_url);
        self.server_path = self.server_path.as_deref().map(expand_env_var_in_string);
    }

    /// Environment variables override file values
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("HKUBE_API_URL") {
            if !url.trim().is_empty() {
                self.hkube_api_url = Some(url);
            }
        }
        if let Ok(model) = env::var("HKUBE_MCP_MODEL") {
            if !model.trim().is_empty() {
                self.model = model;
            }
        }
        if let Some(debug) = env::var("HKUBE_MCP_DEBUG").ok().and_then(|v| parse_flag(&v)) {
            self.debug = debug;
        }
    }
}
