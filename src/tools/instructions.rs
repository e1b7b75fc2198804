use std::sync::Arc;

use super::client::HkubeClient;
use super::input::ToolInput;
use super::registry::{ToolHandler, ToolSpec};
use crate::resources::ResourceStore;

pub const INSTRUCTIONS_RESOURCE: &str = "assistant_instructions";

pub fn tools(_client: &HkubeClient) -> Result<Vec<ToolSpec>, String> {
    Ok(vec![ToolSpec::described(
        "get_instructions",
        "Read assistant instructions",
        "Before answering any question, please refer to your internal instructions to provide accurate and relevant responses. Use available tools first, then fallback on resources, and finally answer based on general knowledge if neither apply",
        ToolHandler::with_resources(|store: Arc<ResourceStore>, input: ToolInput| async move {
            get_instructions(&store, &input)
        }),
    )])
}

pub fn get_instructions(store: &ResourceStore, input: &ToolInput) -> Result<String, String> {
    input.bind(&[])?;
    match store.get(INSTRUCTIONS_RESOURCE) {
        Some(content) if !content.is_empty() => Ok(content.to_string()),
        _ => Ok("No assistant instructions resource found.".to_string()),
    }
}
