use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::client::HkubeClient;
use super::input::ToolInput;
use super::registry::{ToolHandler, ToolSpec};

pub const ENDPOINTS: &[&str] = &["exec"];

#[derive(Debug, Deserialize)]
struct ExecRequest {
    name: String,
    #[serde(default)]
    flow_input: Option<Map<String, Value>>,
}

pub fn tools(client: &HkubeClient) -> Result<Vec<ToolSpec>, String> {
    let client = client.clone();
    Ok(vec![ToolSpec::described(
        "exec_pipeline",
        "Execute stored pipeline",
        "Run a pipeline stored in hkube by name, optionally with a flow_input object.",
        ToolHandler::standalone(move |input: ToolInput| {
            let client = client.clone();
            async move { exec_pipeline(&client, input).await }
        }),
    )])
}

pub async fn exec_pipeline(client: &HkubeClient, input: ToolInput) -> Result<String, String> {
    let request: ExecRequest = input.bind_into(&["name", "flow_input"])?;
    if request.name.trim().is_empty() {
        return Err("Missing required argument: name".to_string());
    }

    let mut body = json!({ "name": request.name });
    if let Some(flow_input) = request.flow_input {
        body["flowInput"] = Value::Object(flow_input);
    }

    let url = client
        .url("exec")
        .map_err(|e| format!("Failed to execute pipeline: {}", e))?;
    client
        .post_json(&format!("{}/stored", url.trim_end_matches('/')), &body)
        .await
        .map_err(|e| format!("Failed to execute pipeline: {}", e))
}
