use serde_json::Value;
use std::sync::Arc;

use super::client::HkubeClient;
use super::input::ToolInput;
use super::registry::{ToolHandler, ToolSpec};
use crate::resources::{ResourceMatch, ResourceStore};

pub fn tools(
    _client: &HkubeClient,
    resources: &Arc<ResourceStore>,
) -> Result<Vec<ToolSpec>, String> {
    let list_store = Arc::clone(resources);
    let read_store = Arc::clone(resources);
    Ok(vec![
        ToolSpec::described(
            "list_resources",
            "List resources",
            "Return a newline-separated list of available resource names.",
            ToolHandler::standalone(move |input: ToolInput| {
                let store = Arc::clone(&list_store);
                async move { list_resources(&store, &input) }
            }),
        ),
        ToolSpec::described(
            "read_resource",
            "Read resource",
            "Return the content of a resource given a name or partial name.",
            ToolHandler::standalone(move |input: ToolInput| {
                let store = Arc::clone(&read_store);
                async move { Ok::<_, String>(read_resource(&store, &input)) }
            }),
        ),
    ])
}

pub fn list_resources(store: &ResourceStore, input: &ToolInput) -> Result<String, String> {
    input.bind(&[])?;
    if store.is_empty() {
        return Ok("No resources available.".to_string());
    }
    Ok(store.names().join("\n"))
}

/// Extra positional or keyword values beyond `query` are ignored.
pub fn read_resource(store: &ResourceStore, input: &ToolInput) -> String {
    let query = match input.arg(0, "query") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    if query.trim().is_empty() {
        return "Please provide a resource name to read. \
                Use `list_resources()` to see available resources."
            .to_string();
    }

    match store.lookup(&query) {
        ResourceMatch::Found(entry) => entry.content.clone(),
        ResourceMatch::Ambiguous(names) => {
            format!("Multiple resources match your query:\n{}", names.join("\n"))
        }
        ResourceMatch::NotFound => format!(
            "No resource found matching '{}'. Use list_resources() to see available resources.",
            query.trim().to_lowercase()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn store() -> ResourceStore {
        ResourceStore::from_files([
            ("assistant_instructions.md", "be helpful"),
            ("pipeline guide.md", "pipelines 101"),
            ("algorithm guide.md", "algorithms 101"),
        ])
    }

    #[test]
    fn query_positional_or_keyword() {
        let store = store();
        let positional = ToolInput::new(vec![json!("pipeline")], Map::new());
        assert_eq!(read_resource(&store, &positional), "pipelines 101");

        let mut kwargs = Map::new();
        kwargs.insert("query".into(), json!("algorithm guide"));
        kwargs.insert("verbose".into(), json!(true));
        let keyword = ToolInput::new(vec![], kwargs);
        assert_eq!(read_resource(&store, &keyword), "algorithms 101");
    }

    #[test]
    fn missing_query_asks_for_one() {
        let text = read_resource(&store(), &ToolInput::default());
        assert!(text.starts_with("Please provide a resource name"));
    }

    #[test]
    fn ambiguous_and_unknown_queries() {
        let store = store();
        let ambiguous = read_resource(&store, &ToolInput::new(vec![json!("guide")], Map::new()));
        assert_eq!(
            ambiguous,
            "Multiple resources match your query:\nalgorithm guide\npipeline guide"
        );

        let unknown = read_resource(&store, &ToolInput::new(vec![json!("Kafka")], Map::new()));
        assert_eq!(
            unknown,
            "No resource found matching 'kafka'. Use list_resources() to see available resources."
        );
    }

    #[test]
    fn list_empty_store() {
        let text = list_resources(&ResourceStore::empty(), &ToolInput::default()).unwrap();
        assert_eq!(text, "No resources available.");
    }
}
