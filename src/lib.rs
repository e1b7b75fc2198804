//! HKube MCP: a stdio tool server proxying the HKube REST API, and a chat
//! client that lets a model decide when to call those tools.

pub mod api;
pub mod cli;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod normalize;
pub mod orchestrator;
pub mod resources;
pub mod tools;
pub mod ui;

pub use error::{HkubeMcpError, Result};
