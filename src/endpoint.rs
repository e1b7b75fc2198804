//! Maps logical API keys (`algorithms`, `pipelines`, `exec`, ...) onto full
//! HKube REST URLs.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    #[error("'hkube_api_url' must be set in the configuration")]
    MissingBaseUrl,
    #[error("Missing API path for key '{0}' in the configuration under 'api_paths'")]
    MissingPath(String),
}

/// Base URL plus per-key path fragments. Immutable once built.
#[derive(Debug, Clone)]
pub struct EndpointTable {
    base_url: String,
    paths: BTreeMap<String, String>,
}

impl EndpointTable {
    pub fn new(
        base_url: impl Into<String>,
        paths: BTreeMap<String, String>,
    ) -> Result<Self, EndpointError> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(EndpointError::MissingBaseUrl);
        }
        Ok(Self { base_url, paths })
    }

    pub fn from_config(config: &Config) -> Result<Self, EndpointError> {
        let base_url = config
            .hkube_api_url
            .as_deref()
            .ok_or(EndpointError::MissingBaseUrl)?;
        Self::new(base_url, config.api_paths.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn resolve(&self, key: &str) -> Result<String, EndpointError> {
        match self.paths.get(key).map(|p| p.trim()) {
            Some(path) if !path.is_empty() => Ok(format!("{}{}", self.base_url, path)),
            _ => Err(EndpointError::MissingPath(key.to_string())),
        }
    }

    /// Check that every key resolves. Startup calls this with the keys of all
    /// registered tool units so a misconfigured path never reaches a tool call.
    pub fn require<'a, I>(&self, keys: I) -> Result<(), EndpointError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for key in keys {
            self.resolve(key)?;
        }
        Ok(())
    }

    /// URL of the job search API. An explicit `exec_search` path wins;
    /// otherwise it is derived from the `exec` path.
    pub fn search_url(&self) -> Result<String, EndpointError> {
        if let Ok(url) = self.resolve("exec_search") {
            return Ok(url);
        }
        let exec = self.resolve("exec")?;
        let url = if exec.ends_with('/') {
            format!("{}/search", exec.trim_end_matches('/'))
        } else if exec.ends_with("/search") {
            exec
        } else {
            format!("{}/search", exec)
        };
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(base: &str, entries: &[(&str, &str)]) -> Result<EndpointTable, EndpointError> {
        let paths = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EndpointTable::new(base, paths)
    }

    #[test]
    fn resolves_configured_key() {
        let endpoints = table("https://h.example", &[("algorithms", "/store/algorithms")]).unwrap();
        assert_eq!(
            endpoints.resolve("algorithms").unwrap(),
            "https://h.example/store/algorithms"
        );
    }

    #[test]
    fn missing_key_is_a_configuration_error() {
        let endpoints = table("https://h.example", &[("algorithms", "/store/algorithms")]).unwrap();
        assert_eq!(
            endpoints.resolve("missing_key"),
            Err(EndpointError::MissingPath("missing_key".to_string()))
        );
        assert!(endpoints.require(["algorithms", "missing_key"]).is_err());
    }

    #[test]
    fn empty_base_url_is_rejected() {
        assert_eq!(table("  ", &[]).unwrap_err(), EndpointError::MissingBaseUrl);
    }

    #[test]
    fn trailing_slash_on_base_is_stripped() {
        let endpoints = table("https://h.example/", &[("pipelines", "/store/pipelines")]).unwrap();
        assert_eq!(
            endpoints.resolve("pipelines").unwrap(),
            "https://h.example/store/pipelines"
        );
    }

    #[test]
    fn search_url_derives_from_exec() {
        let endpoints = table("https://h.example", &[("exec", "/exec")]).unwrap();
        assert_eq!(endpoints.search_url().unwrap(), "https://h.example/exec/search");

        let endpoints = table("https://h.example", &[("exec", "/exec/")]).unwrap();
        assert_eq!(endpoints.search_url().unwrap(), "https://h.example/exec/search");

        let endpoints = table(
            "https://h.example",
            &[("exec", "/exec"), ("exec_search", "/exec/search/v2")],
        )
        .unwrap();
        assert_eq!(endpoints.search_url().unwrap(), "https://h.example/exec/search/v2");
    }
}
