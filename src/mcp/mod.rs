pub mod client;
pub mod server;
pub mod types;

pub use client::{McpClient, McpError};
pub use server::{envelope_schema, McpServer};
pub use types::{McpTool, McpToolResult};
