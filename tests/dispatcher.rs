use hkube_mcp::endpoint::EndpointTable;
use hkube_mcp::resources::ResourceStore;
use hkube_mcp::tools::{
    HkubeClient, RegistryError, ToolHandler, ToolInput, ToolRegistry, ToolSpec, ToolUnit,
    UnitFactory, DEBUG_TOOL_NAME,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

fn offline_client() -> HkubeClient {
    let endpoints = EndpointTable::new("http://127.0.0.1:9", BTreeMap::new()).unwrap();
    HkubeClient::new(Arc::new(endpoints), Duration::from_secs(1)).unwrap()
}

fn store() -> Arc<ResourceStore> {
    Arc::new(ResourceStore::from_files(vec![
        ("assistant_instructions.md", "Be brief."),
        ("pipeline_guide.txt", "Pipelines are DAGs."),
    ]))
}

fn describe(input: ToolInput) -> Result<String, String> {
    let first = match input.args.first() {
        Some(Value::Object(map)) => format!("object {}", Value::Object(map.clone())),
        Some(other) => format!("value {}", other),
        None => "none".to_string(),
    };
    Ok(format!("{} kwargs={}", first, Value::Object(input.kwargs)))
}

fn resource_names(store: &ResourceStore, input: ToolInput) -> Result<String, String> {
    input.bind(&[])?;
    Ok(store.names().join(","))
}

fn refuse(_input: ToolInput) -> Result<String, String> {
    Err("upstream said no".to_string())
}

fn explode(_input: ToolInput) -> Result<String, String> {
    panic!("boom")
}

fn sample_unit(_client: &HkubeClient) -> Result<Vec<ToolSpec>, String> {
    Ok(vec![
        ToolSpec::bare(
            "describe",
            ToolHandler::standalone(|input: ToolInput| async move { describe(input) }),
        ),
        ToolSpec::described(
            "refuse",
            "Refuse",
            "Always fails",
            ToolHandler::standalone(|input: ToolInput| async move { refuse(input) }),
        ),
        ToolSpec::bare(
            "explode",
            ToolHandler::standalone(|input: ToolInput| async move { explode(input) }),
        ),
    ])
}

fn store_unit(_client: &HkubeClient, _store: &Arc<ResourceStore>) -> Result<Vec<ToolSpec>, String> {
    Ok(vec![ToolSpec::bare(
        "resource_names",
        ToolHandler::with_resources(|store: Arc<ResourceStore>, input: ToolInput| async move {
            resource_names(&store, input)
        }),
    )])
}

fn broken_unit(_client: &HkubeClient) -> Result<Vec<ToolSpec>, String> {
    Err("cannot initialise".to_string())
}

fn clashing_unit(_client: &HkubeClient) -> Result<Vec<ToolSpec>, String> {
    Ok(vec![ToolSpec::bare(
        "describe",
        ToolHandler::standalone(|input: ToolInput| async move { refuse(input) }),
    )])
}

fn units() -> Vec<ToolUnit> {
    vec![
        ToolUnit {
            name: "sample",
            endpoints: &[],
            factory: UnitFactory::Plain(sample_unit),
        },
        ToolUnit {
            name: "broken",
            endpoints: &[],
            factory: UnitFactory::Plain(broken_unit),
        },
        ToolUnit {
            name: "store",
            endpoints: &[],
            factory: UnitFactory::WithResources(store_unit),
        },
    ]
}

fn registry() -> ToolRegistry {
    ToolRegistry::discover(&units(), &offline_client(), store()).unwrap()
}

#[tokio::test]
async fn test_no_arguments_match_empty_envelope() {
    let registry = registry();
    let bare = registry.invoke("resource_names", None).await;
    let empty = registry
        .invoke("resource_names", Some(&json!({"args": [], "kwargs": {}})))
        .await;

    assert!(!bare.is_error);
    assert_eq!(bare, empty);
    assert_eq!(bare.text, "assistant_instructions,pipeline_guide");
}

#[tokio::test]
async fn test_json_string_argument_is_parsed() {
    let registry = registry();
    let outcome = registry
        .invoke("describe", Some(&json!({"args": ["{\"x\":1}"]})))
        .await;
    assert_eq!(outcome.text, r#"object {"x":1} kwargs={}"#);

    let whole = registry
        .invoke("describe", Some(&json!(r#"{"kwargs": {"limit": "5"}}"#)))
        .await;
    assert_eq!(whole.text, r#"none kwargs={"limit":5}"#);
}

#[tokio::test]
async fn test_plain_object_becomes_keywords() {
    let registry = registry();
    let outcome = registry
        .invoke("describe", Some(&json!({"pipeline_name": "simple"})))
        .await;
    assert_eq!(outcome.text, r#"none kwargs={"pipeline_name":"simple"}"#);

    let scalar = registry.invoke("describe", Some(&json!("guide"))).await;
    assert_eq!(scalar.text, r#"value "guide" kwargs={}"#);
}

#[tokio::test]
async fn test_handler_error_becomes_text() {
    let registry = registry();
    let outcome = registry.invoke("refuse", None).await;
    assert!(outcome.is_error);
    assert_eq!(outcome.text, "upstream said no");
}

#[tokio::test]
async fn test_handler_panic_becomes_text() {
    let registry = registry();
    let outcome = registry.invoke("explode", None).await;
    assert!(outcome.is_error);
    assert_eq!(outcome.text, "Tool 'explode' failed: boom");

    // The registry keeps serving after a panic
    assert!(!registry.invoke("describe", None).await.is_error);
}

#[tokio::test]
async fn test_unknown_tool() {
    let outcome = registry().invoke("nope", None).await;
    assert!(outcome.is_error);
    assert_eq!(outcome.text, "Tool 'nope' not found");
}

#[tokio::test]
async fn test_surplus_arguments_are_rejected() {
    let outcome = registry()
        .invoke("resource_names", Some(&json!(["extra"])))
        .await;
    assert!(outcome.is_error);
    assert_eq!(outcome.text, "expected at most 0 positional argument(s), got 1");
}

#[test]
fn test_failing_unit_is_skipped() {
    let registry = registry();
    assert_eq!(
        registry.names(),
        vec![DEBUG_TOOL_NAME, "describe", "explode", "refuse", "resource_names"]
    );
    assert_eq!(registry.get("refuse").unwrap().unit, "sample");
    assert_eq!(registry.get("describe").unwrap().title, "describe");
}

#[test]
fn test_duplicate_names_fail_discovery() {
    let mut units = units();
    units.push(ToolUnit {
        name: "clashing",
        endpoints: &[],
        factory: UnitFactory::Plain(clashing_unit),
    });

    match ToolRegistry::discover(&units, &offline_client(), store()) {
        Err(RegistryError::DuplicateTool {
            name,
            existing,
            unit,
        }) => {
            assert_eq!(name, "describe");
            assert_eq!(existing, "sample");
            assert_eq!(unit, "clashing");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("duplicate tool name was accepted"),
    }
}

#[tokio::test]
async fn test_diagnostic_tool_lists_registered_names() {
    let registry = registry();
    let outcome = registry.invoke(DEBUG_TOOL_NAME, None).await;
    assert_eq!(
        outcome.text,
        "Registered tools (4):\ndescribe\nexplode\nrefuse\nresource_names"
    );
}

#[test]
fn test_catalog_lines() {
    let catalog = registry().catalog();
    assert!(catalog.contains("refuse: Always fails"));
    assert!(catalog.lines().any(|line| line == "describe"));
}
