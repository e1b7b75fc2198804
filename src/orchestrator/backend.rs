use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{HkubeMcpError, Result};
use crate::mcp::McpClient;
use crate::tools::{ToolOutcome, ToolRegistry};

/// Catalog offered to the model when tools live on a remote server we cannot list
pub const DEFAULT_REMOTE_CATALOG: &str = "list_algorithms: returns list of algorithms from HKube as JSON\n\
list_pipelines: returns list of pipelines from HKube as JSON\n\
search_jobs_tool: searches HKube jobs and returns the results as JSON\n\
get_instructions: returns the assistant instructions";

/// One tool call as the chat client sees it
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    /// Structured arguments for in-process and launched servers
    pub arguments: Option<Value>,
    /// Free-text prompt for the remote HTTP tool API
    pub prompt: String,
}

impl ToolCall {
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: None,
            prompt: String::new(),
        }
    }

    /// From user-supplied text: JSON is taken as the arguments, other text
    /// as the single positional argument.
    pub fn from_text(name: impl Into<String>, text: &str) -> Self {
        let text = text.trim();
        let arguments = if text.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<Value>(text)
                    .unwrap_or_else(|_| Value::String(text.to_string())),
            )
        };
        Self {
            name: name.into(),
            arguments,
            prompt: text.to_string(),
        }
    }
}

/// HTTP tool API exposed by a remote MCP host: `POST {base}/api/tool/{name}`
#[derive(Debug, Clone)]
pub struct RemoteTools {
    http: Client,
    base_url: String,
    model: String,
}

impl RemoteTools {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        timeout_secs: u64,
        verify_tls: bool,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .danger_accept_invalid_certs(!verify_tls)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    pub async fn call(&self, name: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/api/tool/{}", self.base_url, name);
        let body = json!({ "model": self.model, "prompt": prompt, "stream": false });
        tracing::debug!(url = %url, "remote tool call");

        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(HkubeMcpError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        Ok(match serde_json::from_str::<Value>(&text) {
            Ok(value) => value.to_string(),
            Err(_) => text,
        })
    }
}

/// Where tools run for the chat client
pub enum ToolBackend {
    /// Registry hosted in this process
    Local(Arc<ToolRegistry>),
    /// Server launched as a child process over stdio
    Launched(McpClient),
    /// Remote HTTP tool API
    Remote(RemoteTools),
}

impl ToolBackend {
    pub fn catalog(&self) -> String {
        match self {
            ToolBackend::Local(registry) => registry.catalog(),
            ToolBackend::Launched(client) => client.catalog(),
            ToolBackend::Remote(_) => DEFAULT_REMOTE_CATALOG.to_string(),
        }
    }

    pub fn has_tool(&self, name: &str) -> bool {
        match self {
            ToolBackend::Local(registry) => registry.contains(name),
            ToolBackend::Launched(client) => client.has_tool(name),
            ToolBackend::Remote(_) => DEFAULT_REMOTE_CATALOG
                .lines()
                .filter_map(|line| line.split(':').next())
                .any(|tool| tool.trim() == name),
        }
    }

    /// Tool names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = match self {
            ToolBackend::Local(registry) => {
                registry.names().into_iter().map(String::from).collect()
            }
            ToolBackend::Launched(client) => {
                client.tools().iter().map(|t| t.name.clone()).collect()
            }
            ToolBackend::Remote(_) => DEFAULT_REMOTE_CATALOG
                .lines()
                .filter_map(|line| line.split(':').next())
                .map(|tool| tool.trim().to_string())
                .collect(),
        };
        names.sort();
        names
    }

    /// Never fails; transport problems come back as error text
    pub async fn invoke(&self, call: &ToolCall, timeout_secs: u64) -> ToolOutcome {
        match self {
            ToolBackend::Local(registry) => {
                let invocation = registry.invoke(&call.name, call.arguments.as_ref());
                match tokio::time::timeout(Duration::from_secs(timeout_secs), invocation).await {
                    Ok(outcome) => outcome,
                    Err(_) => ToolOutcome::error(format!(
                        "Tool '{}' timed out after {} seconds",
                        call.name, timeout_secs
                    )),
                }
            }
            ToolBackend::Launched(client) => {
                let arguments = call.arguments.clone().unwrap_or_else(|| json!({}));
                match client.call_tool(&call.name, arguments, timeout_secs).await {
                    Ok(result) => ToolOutcome {
                        text: result.joined_text(),
                        is_error: result.is_error(),
                    },
                    Err(e) => ToolOutcome::error(format!("Tool request failed: {}", e)),
                }
            }
            ToolBackend::Remote(remote) => match remote.call(&call.name, &call.prompt).await {
                Ok(text) => ToolOutcome::ok(text),
                Err(e) => ToolOutcome::error(format!("Remote tool call failed: {}", e)),
            },
        }
    }

    /// Stops a launched server; other backends have nothing to release
    pub async fn shutdown(self) {
        if let ToolBackend::Launched(client) = self {
            if let Err(e) = client.shutdown().await {
                tracing::warn!(error = %e, "error while stopping MCP server");
            }
        }
    }
}
