use serde_json::Value;

use super::client::HkubeClient;
use super::input::ToolInput;
use super::registry::{ToolHandler, ToolSpec};

pub const ENDPOINTS: &[&str] = &["pipelines"];

pub fn tools(client: &HkubeClient) -> Result<Vec<ToolSpec>, String> {
    let list_client = client.clone();
    let create_client = client.clone();
    Ok(vec![
        ToolSpec::described(
            "list_pipelines",
            "List pipelines",
            "Retrieve stored pipelines from the hkube store.",
            ToolHandler::standalone(move |input: ToolInput| {
                let client = list_client.clone();
                async move { list_pipelines(&client, input).await }
            }),
        ),
        ToolSpec::described(
            "create_pipeline",
            "Create pipeline",
            "Create a new pipeline in hkube by providing a pipeline JSON.",
            ToolHandler::standalone(move |input: ToolInput| {
                let client = create_client.clone();
                async move { create_pipeline(&client, input).await }
            }),
        ),
    ])
}

pub async fn list_pipelines(client: &HkubeClient, input: ToolInput) -> Result<String, String> {
    input.bind(&[])?;
    client
        .get("pipelines")
        .await
        .map_err(|e| format!("Unable to fetch pipelines: {}", e))
}

pub async fn create_pipeline(client: &HkubeClient, input: ToolInput) -> Result<String, String> {
    let mut bound = input.bind(&["pipeline_json"])?;
    let pipeline = match bound.remove("pipeline_json") {
        Some(Value::Object(map)) => Value::Object(map),
        Some(other) => {
            return Err(format!(
                "Failed to create pipeline: pipeline_json must be an object, got {}",
                other
            ))
        }
        None => return Err("Missing required argument: pipeline_json".to_string()),
    };

    let url = client
        .url("pipelines")
        .map_err(|e| format!("Failed to create pipeline: {}", e))?;
    client
        .post_json(&url, &pipeline)
        .await
        .map_err(|e| format!("Failed to create pipeline: {}", e))
}
