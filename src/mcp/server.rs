use serde_json::{json, Value};
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use super::types::{
    methods, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, McpResource,
    McpTool, McpToolResult, ResourceContents, ResourceListResponse, ResourceReadResponse,
    ResourcesCapability, ServerCapabilities, ServerInfo, ToolListResponse, ToolsCapability,
    MCP_PROTOCOL_VERSION,
};
use crate::resources::ResourceEntry;
use crate::tools::ToolRegistry;

/// Input schema advertised for every tool: the generic `{args, kwargs}`
/// envelope. Other argument shapes are accepted as well.
pub fn envelope_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "args": {
                "type": "array",
                "description": "Positional arguments"
            },
            "kwargs": {
                "type": "object",
                "description": "Keyword arguments"
            }
        }
    })
}

/// Serves the tool registry and its resources over newline-delimited
/// JSON-RPC.
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    name: String,
    version: String,
}

impl McpServer {
    pub fn new(registry: Arc<ToolRegistry>, name: impl Into<String>) -> Self {
        Self {
            registry,
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Returns `None` for notifications
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id.clone() else {
            tracing::debug!(method = %request.method, "notification");
            return None;
        };

        let response = match request.method.as_str() {
            methods::INITIALIZE => self.handle_initialize(id),
            methods::PING => JsonRpcResponse::success(id, json!({})),
            methods::TOOLS_LIST => self.handle_tools_list(id),
            methods::TOOLS_CALL => self.handle_tools_call(id, request.params).await,
            methods::RESOURCES_LIST => self.handle_resources_list(id),
            methods::RESOURCES_READ => self.handle_resources_read(id, request.params),
            other => {
                tracing::warn!(method = other, "unknown method");
                JsonRpcResponse::error(id, JsonRpcError::method_not_found(other))
            }
        };
        Some(response)
    }

    /// Parse one frame and serialize the response, if any
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let response = match serde_json::from_str::<Value>(line) {
            Err(e) => Some(JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error(e))),
            // An explicit null id is not a notification
            Ok(value) if value.get("id").is_some_and(Value::is_null) => {
                let error = JsonRpcError::invalid_request("id must not be null");
                Some(JsonRpcResponse::error(Value::Null, error))
            }
            Ok(value) => {
                let id = value.get("id").cloned().unwrap_or(Value::Null);
                match serde_json::from_value::<JsonRpcRequest>(value) {
                    Ok(request) => self.handle_request(request).await,
                    Err(e) => Some(JsonRpcResponse::error(id, JsonRpcError::invalid_request(e))),
                }
            }
        }?;

        match serde_json::to_string(&response) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize response");
                None
            }
        }
    }

    fn handle_initialize(&self, id: Value) -> JsonRpcResponse {
        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            server_info: ServerInfo {
                name: self.name.clone(),
                version: self.version.clone(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
                resources: Some(ResourcesCapability {
                    subscribe: Some(false),
                    list_changed: Some(false),
                }),
            },
        };
        to_response(id, &result)
    }

    fn handle_tools_list(&self, id: Value) -> JsonRpcResponse {
        let tools = self
            .registry
            .descriptors()
            .into_iter()
            .map(|d| McpTool {
                name: d.name.clone(),
                title: Some(d.title.clone()),
                description: Some(d.description.clone()),
                input_schema: envelope_schema(),
            })
            .collect();
        to_response(id, &ToolListResponse { tools })
    }

    async fn handle_tools_call(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params = params.unwrap_or(Value::Null);
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::error(id, JsonRpcError::invalid_params("missing tool name"));
        };

        let outcome = self.registry.invoke(name, params.get("arguments")).await;
        to_response(id, &McpToolResult::text(outcome.text, outcome.is_error))
    }

    fn handle_resources_list(&self, id: Value) -> JsonRpcResponse {
        let resources = self
            .registry
            .resources()
            .entries()
            .map(|entry| McpResource {
                uri: entry.uri.clone(),
                name: entry.name.clone(),
                description: Some(format!("Resource file: {}", entry.file_name)),
                mime_type: Some(mime_type(entry).to_string()),
            })
            .collect();
        to_response(id, &ResourceListResponse { resources })
    }

    fn handle_resources_read(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params = params.unwrap_or(Value::Null);
        let Some(uri) = params.get("uri").and_then(Value::as_str) else {
            return JsonRpcResponse::error(id, JsonRpcError::invalid_params("missing uri"));
        };

        match self.registry.resources().by_uri(uri) {
            Some(entry) => to_response(
                id,
                &ResourceReadResponse {
                    contents: vec![ResourceContents {
                        uri: entry.uri.clone(),
                        mime_type: Some(mime_type(entry).to_string()),
                        text: Some(entry.content.clone()),
                    }],
                },
            ),
            None => JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_params(format!("Resource not found: {}", uri)),
            ),
        }
    }

    /// Serve until `reader` reaches EOF. Each request runs on its own task;
    /// a single writer task owns `writer` so frames never interleave.
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, writer: W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        let writer_task = tokio::spawn(async move {
            let mut writer = writer;
            while let Some(frame) = rx.recv().await {
                writer.write_all(frame.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
            Ok::<(), io::Error>(())
        });

        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let server = Arc::clone(&self);
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(frame) = server.handle_line(&line).await {
                    if tx.send(frame).is_err() {
                        tracing::warn!("output closed before response could be written");
                    }
                }
            });
        }

        tracing::info!("input closed; finishing in-flight requests");
        drop(tx);
        match writer_task.await {
            Ok(result) => result,
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
        }
    }

    pub async fn serve_stdio(self: Arc<Self>) -> io::Result<()> {
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }
}

fn to_response<T: serde::Serialize>(id: Value, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e)),
    }
}

fn mime_type(entry: &ResourceEntry) -> &'static str {
    match Path::new(&entry.file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("md") => "text/markdown",
        Some("json") => "application/json",
        Some("yaml") | Some("yml") => "application/yaml",
        _ => "text/plain",
    }
}
