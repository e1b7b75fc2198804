use super::client::HkubeClient;
use super::input::ToolInput;
use super::registry::{ToolHandler, ToolSpec};

pub const ENDPOINTS: &[&str] = &["algorithms"];

pub fn tools(client: &HkubeClient) -> Result<Vec<ToolSpec>, String> {
    let client = client.clone();
    Ok(vec![ToolSpec::described(
        "list_algorithms",
        "List algorithms",
        "Retrieve stored algorithm definitions from the hkube store API and return them as JSON.",
        ToolHandler::standalone(move |input: ToolInput| {
            let client = client.clone();
            async move { list_algorithms(&client, input).await }
        }),
    )])
}

pub async fn list_algorithms(client: &HkubeClient, input: ToolInput) -> Result<String, String> {
    input.bind(&[])?;
    client
        .get("algorithms")
        .await
        .map_err(|e| format!("Unable to fetch algorithms: {}", e))
}
