use colored::*;
use serde_json::{json, Value};
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};

use super::types::{
    methods, InitializeResult, JsonRpcRequest, JsonRpcResponse, McpTool, McpToolResult,
    ResourceListResponse, ResourceReadResponse, ServerInfo, ToolListResponse,
    MCP_PROTOCOL_VERSION,
};

const CLIENT_NAME: &str = "mcp-cli";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum McpError {
    #[error("Failed to start MCP server '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("MCP server I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid MCP message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("MCP error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("MCP server closed the connection")]
    Closed,
    #[error("MCP server did not expose {0}")]
    MissingPipe(&'static str),
    #[error("Tool '{tool}' timed out after {secs} seconds")]
    Timeout { tool: String, secs: u64 },
    #[error("MCP server '{program}' did not complete the handshake within {secs} seconds")]
    HandshakeTimeout { program: String, secs: u64 },
}

struct Connection {
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    next_id: u64,
}

/// Client for a tool server launched as a child process and spoken to over
/// its stdin/stdout.
pub struct McpClient {
    child: Mutex<Child>,
    conn: Mutex<Connection>,
    server_info: ServerInfo,
    tools: Vec<McpTool>,
    stderr_relay: Option<JoinHandle<()>>,
    verbose: bool,
}

impl McpClient {
    /// Start `program`, complete the handshake and fetch the tool list. The
    /// child is killed if the handshake takes longer than `handshake_secs`.
    pub async fn launch(
        program: &str,
        args: &[String],
        handshake_secs: u64,
        verbose: bool,
    ) -> Result<Self, McpError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| McpError::Spawn {
                program: program.to_string(),
                source,
            })?;
        tracing::info!(program, pid = ?child.id(), "launched MCP server");

        let stdin = child.stdin.take().ok_or(McpError::MissingPipe("stdin"))?;
        let stdout = child.stdout.take().ok_or(McpError::MissingPipe("stdout"))?;
        let stderr_relay = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    eprintln!("{} {}", "[server ERR]".dimmed(), line);
                }
            })
        });

        let mut conn = Connection {
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
            next_id: 1,
        };

        let handshake = async {
            let init_params = json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {
                    "name": CLIENT_NAME,
                    "version": env!("CARGO_PKG_VERSION")
                }
            });
            let response = conn.request(methods::INITIALIZE, Some(init_params)).await?;
            let init: InitializeResult = serde_json::from_value(response)?;
            conn.notify(methods::INITIALIZED, None).await?;

            let listed = conn.request(methods::TOOLS_LIST, None).await?;
            let tools = serde_json::from_value::<ToolListResponse>(listed)?.tools;
            Ok::<_, McpError>((init, tools))
        };

        let (init, tools) = match timeout(Duration::from_secs(handshake_secs), handshake).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(program, "MCP handshake timed out; killing server");
                if let Err(e) = child.kill().await {
                    tracing::debug!(error = %e, "failed to kill MCP server");
                }
                return Err(McpError::HandshakeTimeout {
                    program: program.to_string(),
                    secs: handshake_secs,
                });
            }
        };

        if verbose {
            println!(
                "Connected to MCP server: {} v{}",
                init.server_info.name, init.server_info.version
            );
        }
        tracing::debug!(count = tools.len(), "discovered server tools");

        Ok(Self {
            child: Mutex::new(child),
            conn: Mutex::new(conn),
            server_info: init.server_info,
            tools,
            stderr_relay,
            verbose,
        })
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    pub fn tools(&self) -> &[McpTool] {
        &self.tools
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name == name)
    }

    /// `name: description` lines for the decision prompt
    pub fn catalog(&self) -> String {
        let mut tools: Vec<&McpTool> = self.tools.iter().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
            .iter()
            .map(|t| match t.description.as_deref() {
                Some(d) if !d.is_empty() => format!("{}: {}", t.name, d),
                _ => t.name.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
        timeout_secs: u64,
    ) -> Result<McpToolResult, McpError> {
        if self.verbose {
            eprintln!("{} {} {}", "[tool]".cyan(), name, arguments);
        }
        let params = json!({ "name": name, "arguments": arguments });
        let call = async {
            let mut conn = self.conn.lock().await;
            conn.request(methods::TOOLS_CALL, Some(params)).await
        };
        let response = timeout(Duration::from_secs(timeout_secs), call)
            .await
            .map_err(|_| McpError::Timeout {
                tool: name.to_string(),
                secs: timeout_secs,
            })??;
        Ok(serde_json::from_value(response)?)
    }

    pub async fn list_resources(&self) -> Result<ResourceListResponse, McpError> {
        let mut conn = self.conn.lock().await;
        let response = conn.request(methods::RESOURCES_LIST, None).await?;
        Ok(serde_json::from_value(response)?)
    }

    pub async fn read_resource(&self, uri: &str) -> Result<ResourceReadResponse, McpError> {
        let mut conn = self.conn.lock().await;
        let response = conn
            .request(methods::RESOURCES_READ, Some(json!({ "uri": uri })))
            .await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Close the server's stdin so it can exit on its own, then kill it if
    /// it is still running after the grace period.
    pub async fn shutdown(self) -> Result<(), McpError> {
        let mut conn = self.conn.into_inner();
        drop(conn.stdin.take());

        let mut child = self.child.into_inner();
        match timeout(SHUTDOWN_GRACE, child.wait()).await {
            Ok(status) => {
                let status = status?;
                tracing::info!(?status, "MCP server exited");
            }
            Err(_) => {
                tracing::warn!("MCP server did not exit in time; killing it");
                child.kill().await?;
            }
        }

        if let Some(relay) = self.stderr_relay {
            let _ = relay.await;
        }
        Ok(())
    }
}

impl Connection {
    async fn send(&mut self, request: &JsonRpcRequest) -> Result<(), McpError> {
        let stdin = self.stdin.as_mut().ok_or(McpError::Closed)?;
        let mut frame = serde_json::to_string(request)?;
        frame.push('\n');
        stdin.write_all(frame.as_bytes()).await?;
        stdin.flush().await?;
        Ok(())
    }

    async fn request(&mut self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let id = self.next_id;
        self.next_id += 1;
        self.send(&JsonRpcRequest::new(id, method, params)).await?;

        let mut line = String::new();
        loop {
            line.clear();
            if self.stdout.read_line(&mut line).await? == 0 {
                return Err(McpError::Closed);
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let response: JsonRpcResponse = match serde_json::from_str(trimmed) {
                Ok(response) => response,
                Err(_) => {
                    tracing::debug!(line = trimmed, "ignoring non-response line from server");
                    continue;
                }
            };
            if response.id != json!(id) {
                continue;
            }
            if let Some(error) = response.error {
                return Err(McpError::Rpc {
                    code: error.code,
                    message: error.message,
                });
            }
            return Ok(response.result.unwrap_or(Value::Null));
        }
    }

    async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        self.send(&JsonRpcRequest::notification(method, params)).await
    }
}
