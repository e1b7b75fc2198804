use hkube_mcp::api::GenerateClient;
use hkube_mcp::endpoint::EndpointTable;
use hkube_mcp::orchestrator::{
    ChatOrchestrator, KeywordRule, RuleTable, ToolBackend, ToolCall, TurnError, TurnOutcome,
};
use hkube_mcp::resources::ResourceStore;
use hkube_mcp::tools::{builtin_units, HkubeClient, ToolRegistry};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DECISION_MARKER: &str = "decides whether to call MCP tools";
const FOLLOWUP_MARKER: &str = "The tool returned:";

async fn hkube_with_algorithms() -> MockServer {
    let hkube = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/store/algorithms"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"[{"name":"green-alg"},{"name":"yellow-alg"}]"#),
        )
        .mount(&hkube)
        .await;
    hkube
}

fn local_backend(hkube: &MockServer) -> ToolBackend {
    let paths: BTreeMap<String, String> = [
        ("algorithms", "/store/algorithms"),
        ("pipelines", "/store/pipelines"),
        ("exec", "/exec"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let endpoints = EndpointTable::new(hkube.uri(), paths).unwrap();
    let client = HkubeClient::new(Arc::new(endpoints), Duration::from_secs(5)).unwrap();
    let registry =
        ToolRegistry::discover(&builtin_units(), &client, Arc::new(ResourceStore::empty()))
            .unwrap();
    ToolBackend::Local(Arc::new(registry))
}

fn generated(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "model": "gpt-oss:20b",
        "response": text,
        "done": true
    }))
}

async fn mount_decision(generator: &MockServer, decision: &str) {
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_string_contains(DECISION_MARKER))
        .respond_with(generated(decision))
        .expect(1)
        .mount(generator)
        .await;
}

fn orchestrator(generator: &MockServer, backend: Option<ToolBackend>) -> ChatOrchestrator {
    let client = GenerateClient::new(&generator.uri(), "gpt-oss:20b", 10, true).unwrap();
    ChatOrchestrator::new(client, backend)
        .with_auto_tools(true)
        .with_tool_timeout(10)
}

#[tokio::test]
async fn test_list_the_algorithms() {
    let hkube = hkube_with_algorithms().await;
    let generator = MockServer::start().await;
    mount_decision(
        &generator,
        r#"Sure. {"use_tool": true, "tool_name": "list_algorithms", "tool_prompt": ""}"#,
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_string_contains(FOLLOWUP_MARKER))
        .and(body_string_contains("green-alg"))
        .respond_with(generated("There are two algorithms: green-alg and yellow-alg."))
        .expect(1)
        .mount(&generator)
        .await;

    let outcome = orchestrator(&generator, Some(local_backend(&hkube)))
        .run_turn("list the algorithms")
        .await
        .unwrap();

    match outcome {
        TurnOutcome::ToolAssisted {
            tool,
            output,
            answer,
            forced,
        } => {
            assert_eq!(tool, "list_algorithms");
            assert!(!output.is_error);
            assert_eq!(output.text, r#"[{"name":"green-alg"},{"name":"yellow-alg"}]"#);
            assert_eq!(answer, "There are two algorithms: green-alg and yellow-alg.");
            assert!(!forced);
        }
        other => panic!("expected a tool-assisted answer, got {other:?}"),
    }
}

#[tokio::test]
async fn test_keyword_rule_forces_tool_when_model_declines() {
    let hkube = hkube_with_algorithms().await;
    let generator = MockServer::start().await;
    mount_decision(&generator, r#"{"use_tool": false}"#).await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_string_contains(FOLLOWUP_MARKER))
        .respond_with(generated("Two algorithms."))
        .expect(1)
        .mount(&generator)
        .await;

    let rules = RuleTable::new(vec![KeywordRule::new(&["algorithm"], "list_algorithms")]);
    let outcome = orchestrator(&generator, Some(local_backend(&hkube)))
        .with_rules(rules)
        .run_turn("Which Algorithms are deployed?")
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        TurnOutcome::ToolAssisted { ref tool, forced: true, .. } if tool == "list_algorithms"
    ));
    assert_eq!(outcome.answer(), "Two algorithms.");
}

#[tokio::test]
async fn test_declined_decision_answers_directly() {
    let hkube = hkube_with_algorithms().await;
    let generator = MockServer::start().await;
    mount_decision(&generator, "I do not think a tool is needed.").await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"prompt": "hello there", "stream": false})))
        .respond_with(generated("Hi!"))
        .expect(1)
        .mount(&generator)
        .await;

    let outcome = orchestrator(&generator, Some(local_backend(&hkube)))
        .run_turn("hello there")
        .await
        .unwrap();
    assert_eq!(
        outcome,
        TurnOutcome::Direct {
            answer: "Hi!".to_string()
        }
    );
}

#[tokio::test]
async fn test_tool_requested_without_name_aborts_turn() {
    let hkube = hkube_with_algorithms().await;
    let generator = MockServer::start().await;
    mount_decision(&generator, r#"{"use_tool": true}"#).await;

    let result = orchestrator(&generator, Some(local_backend(&hkube)))
        .run_turn("do something")
        .await;
    assert!(matches!(result, Err(TurnError::MissingToolName)));
}

#[tokio::test]
async fn test_auto_tools_off_skips_decision() {
    let generator = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_string_contains(DECISION_MARKER))
        .respond_with(generated("{}"))
        .expect(0)
        .mount(&generator)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"prompt": "list the algorithms"})))
        .respond_with(generated("I cannot see your cluster."))
        .expect(1)
        .mount(&generator)
        .await;

    let outcome = orchestrator(&generator, None)
        .with_auto_tools(false)
        .run_turn("list the algorithms")
        .await
        .unwrap();
    assert_eq!(outcome.answer(), "I cannot see your cluster.");
}

#[tokio::test]
async fn test_generation_failure_is_reported() {
    let generator = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
        .mount(&generator)
        .await;

    let result = orchestrator(&generator, None).run_turn("hi").await;
    match result {
        Err(TurnError::Generate(e)) => assert!(e.to_string().contains("503")),
        other => panic!("expected a generation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_run_tool_without_backend() {
    let generator = MockServer::start().await;
    let result = orchestrator(&generator, None)
        .run_tool(&ToolCall::bare("list_algorithms"))
        .await;
    assert!(matches!(result, Err(TurnError::NoBackend)));
}

#[tokio::test]
async fn test_remote_backend_posts_tool_prompt() {
    let remote = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tool/read_resource"))
        .and(body_partial_json(json!({
            "model": "gpt-oss:20b",
            "prompt": "pipeline guide",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "guide"})))
        .expect(1)
        .mount(&remote)
        .await;

    let tools =
        hkube_mcp::orchestrator::RemoteTools::new(&remote.uri(), "gpt-oss:20b", 5, true).unwrap();
    let backend = ToolBackend::Remote(tools);
    let outcome = backend
        .invoke(&ToolCall::from_text("read_resource", "pipeline guide"), 5)
        .await;
    assert!(!outcome.is_error);
    assert_eq!(outcome.text, r#"{"text":"guide"}"#);
}
