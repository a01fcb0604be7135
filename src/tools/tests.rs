use super::*;
use crate::mcp::client::tests::{connect_fake, echo_server, ok};
use crate::mcp::McpError;
use crate::output::RecordingRenderer;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Returns its input back as JSON text.
struct InputTool;

#[async_trait::async_trait]
impl Tool for InputTool {
    fn name(&self) -> &str {
        "input"
    }

    fn description(&self) -> &str {
        "Returns the arguments it was called with"
    }

    fn schema(&self) -> Value {
        json!({"title": "Input", "type": "object", "properties": {}})
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        Ok(ToolResult::success(input.to_string()))
    }
}

/// Reports a failure the model should see.
struct RefusingTool;

#[async_trait::async_trait]
impl Tool for RefusingTool {
    fn name(&self) -> &str {
        "refuse"
    }

    fn description(&self) -> &str {
        "Always refuses"
    }

    fn schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _input: Value) -> Result<ToolResult> {
        Ok(ToolResult::error("not allowed"))
    }
}

fn builtin_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(InputTool));
    registry.register(Box::new(RefusingTool));
    registry
}

#[tokio::test]
async fn test_registry_with_builtins() {
    let registry = builtin_registry();
    assert_eq!(registry.len(), 2);
    assert!(!registry.is_empty());
    assert_eq!(registry.names(), vec!["input", "refuse"]);

    let defs = registry.definitions();
    assert_eq!(defs[0].description, "Returns the arguments it was called with");
    assert_eq!(defs[0].parameters, json!({"type": "object", "properties": {}}));
}

#[tokio::test]
async fn test_empty_and_null_arguments_mean_empty_object() {
    let registry = builtin_registry();
    for raw in ["", "null", "  ", " null "] {
        let out = registry.execute("input", raw).await.unwrap();
        assert_eq!(out, "{}", "arguments {raw:?}");
    }
}

#[tokio::test]
async fn test_object_arguments_are_passed_through() {
    let registry = builtin_registry();
    let out = registry.execute("input", r#"{"path":"a.txt"}"#).await.unwrap();
    assert_eq!(out, r#"{"path":"a.txt"}"#);
}

#[tokio::test]
async fn test_invalid_arguments_are_a_hard_error() {
    let registry = builtin_registry();
    let err = registry.execute("input", "{bad json").await.unwrap_err();
    assert!(matches!(err, ToolError::InvalidArguments(_)));
    assert!(err.to_string().starts_with("invalid json args from model"));

    let err = registry.execute("input", "[1, 2]").await.unwrap_err();
    assert!(matches!(err, ToolError::InvalidArguments(_)));
}

#[tokio::test]
async fn test_unknown_tool() {
    let registry = builtin_registry();
    let err = registry.execute("nonexistent", "{}").await.unwrap_err();
    assert!(matches!(err, ToolError::NotFound(ref n) if n == "nonexistent"));
}

#[tokio::test]
async fn test_builtin_failure_is_folded_into_text() {
    let registry = builtin_registry();
    let out = registry.execute("refuse", "").await.unwrap();
    assert_eq!(out, "Tool Error: not allowed");
}

#[tokio::test]
async fn test_duplicate_names_keep_first_registration() {
    let mut registry = builtin_registry();
    registry.register(Box::new(InputTool));
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_sanitize_schema_defaults_when_missing() {
    let expected = json!({"type": "object", "properties": {}, "additionalProperties": false});
    assert_eq!(sanitize_schema(None), expected);
    assert_eq!(sanitize_schema(Some(Value::Null)), expected);
    assert_eq!(sanitize_schema(Some(json!("not a schema"))), expected);
}

#[test]
fn test_sanitize_schema_strips_and_fills() {
    let schema = json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "Args",
        "required": ["q"],
    });
    assert_eq!(
        sanitize_schema(Some(schema)),
        json!({"type": "object", "properties": {}, "required": ["q"]})
    );
}

#[test]
fn test_sanitize_schema_keeps_existing_fields() {
    let schema = json!({
        "type": "object",
        "properties": {"q": {"type": "string"}},
        "additionalProperties": true,
    });
    assert_eq!(sanitize_schema(Some(schema.clone())), schema);
}

#[test]
fn test_sanitize_tool_name() {
    assert_eq!(sanitize_tool_name("read_file"), "read_file");
    assert_eq!(sanitize_tool_name(r#"read_file{"path": "x"}"#), "read_file");
    assert_eq!(sanitize_tool_name("search=foo"), "search");
    assert_eq!(sanitize_tool_name("  echo  "), "echo");
    assert_eq!(sanitize_tool_name(" echo ={"), "echo");
}

#[tokio::test]
async fn test_remote_tools_are_registered_and_executed() {
    let client = Arc::new(connect_fake(echo_server).await.unwrap());
    let mut registry = ToolRegistry::new();
    let added = registry.load_remote(client).await.unwrap();
    assert_eq!(added, 1);

    let defs = registry.definitions();
    assert_eq!(defs[0].name, "echo");
    assert_eq!(defs[0].description, "Echo text back");
    assert_eq!(
        defs[0].parameters,
        json!({
            "type": "object",
            "properties": {"text": {"type": "string"}},
            "required": ["text"]
        })
    );

    let out = registry.execute("echo", r#"{"text":"hi"}"#).await.unwrap();
    assert_eq!(out, "hi");
    registry.close().await;
}

fn canned_call_server(result: Value) -> impl FnMut(&Value) -> Vec<String> + Send + 'static {
    move |msg| match msg["method"].as_str() {
        Some("tools/call") => vec![ok(&msg["id"], result.clone())],
        _ => echo_server(msg),
    }
}

#[tokio::test]
async fn test_remote_error_result_is_folded() {
    let client = connect_fake(canned_call_server(json!({
        "content": [{"type": "text", "text": "boom"}, {"type": "text", "text": "ignored"}],
        "isError": true
    })))
    .await
    .unwrap();
    let mut registry = ToolRegistry::new();
    registry.load_remote(Arc::new(client)).await.unwrap();

    let out = registry.execute("echo", "{}").await.unwrap();
    assert_eq!(out, "Tool Error: boom");
}

#[tokio::test]
async fn test_remote_error_without_content_uses_placeholder() {
    let client = connect_fake(canned_call_server(json!({"content": [], "isError": true})))
        .await
        .unwrap();
    let mut registry = ToolRegistry::new();
    registry.load_remote(Arc::new(client)).await.unwrap();

    let out = registry.execute("echo", "").await.unwrap();
    assert_eq!(out, "Tool failed with unspecified error");
}

#[tokio::test]
async fn test_remote_success_joins_text_blocks() {
    let client = connect_fake(canned_call_server(json!({
        "content": [
            {"type": "text", "text": "one"},
            {"type": "image", "data": "aGk=", "mimeType": "image/png"},
            {"type": "text", "text": "two"}
        ]
    })))
    .await
    .unwrap();
    let mut registry = ToolRegistry::new();
    registry.load_remote(Arc::new(client)).await.unwrap();

    assert_eq!(registry.execute("echo", "").await.unwrap(), "one\ntwo");
}

#[tokio::test]
async fn test_remote_success_without_text_is_success() {
    let client = connect_fake(canned_call_server(json!({"content": []})))
        .await
        .unwrap();
    let mut registry = ToolRegistry::new();
    registry.load_remote(Arc::new(client)).await.unwrap();

    assert_eq!(registry.execute("echo", "").await.unwrap(), "success");
}

#[tokio::test]
async fn test_remote_rpc_error_is_a_hard_error() {
    let client = connect_fake(|msg: &Value| match msg["method"].as_str() {
        Some("tools/call") => vec![json!({
            "jsonrpc": "2.0",
            "id": msg["id"],
            "error": {"code": -32602, "message": "unknown tool"}
        })
        .to_string()],
        _ => echo_server(msg),
    })
    .await
    .unwrap();
    let mut registry = ToolRegistry::new();
    registry.load_remote(Arc::new(client)).await.unwrap();

    let err = registry.execute("echo", "{}").await.unwrap_err();
    assert!(matches!(
        err,
        ToolError::Remote(McpError::Rpc { code: -32602, .. })
    ));
}

#[tokio::test]
async fn test_close_closes_each_client_once() {
    let lists = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&lists);
    let client = connect_fake(move |msg: &Value| match msg["method"].as_str() {
        Some("tools/list") => {
            counter.fetch_add(1, Ordering::SeqCst);
            vec![ok(
                &msg["id"],
                json!({"tools": [{"name": "a"}, {"name": "b"}, {"name": "c"}]}),
            )]
        }
        _ => echo_server(msg),
    })
    .await
    .unwrap();
    let client = Arc::new(client);

    let mut registry = ToolRegistry::new();
    assert_eq!(registry.load_remote(Arc::clone(&client)).await.unwrap(), 3);
    assert_eq!(lists.load(Ordering::SeqCst), 1);
    // three descriptors, the registry's client list and the local handle
    assert_eq!(Arc::strong_count(&client), 5);

    registry.close().await;
    registry.close().await;

    let err = registry.execute("a", "{}").await.unwrap_err();
    assert!(matches!(err, ToolError::Remote(McpError::Closed { .. })));
}

#[tokio::test]
async fn test_connect_fails_fast_on_bad_server() {
    let mut renderer = RecordingRenderer::default();
    let commands = vec!["definitely-not-a-real-binary-xyz".to_string()];
    let err = ToolRegistry::connect(&commands, &mut renderer)
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("definitely-not-a-real-binary-xyz"));
    assert_eq!(renderer.infos.len(), 1);
}

#[tokio::test]
async fn test_connect_with_no_servers_is_empty() {
    let mut renderer = RecordingRenderer::default();
    let registry = ToolRegistry::connect(&["  ".to_string()], &mut renderer)
        .await
        .unwrap();
    assert!(registry.is_empty());
    assert!(renderer.infos.is_empty());
}

/// A scripted MCP server in plain `sh`: answers requests 1..=3 in order.
const SH_SERVER: &str = r#"read line
echo '{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","capabilities":{"tools":{}},"serverInfo":{"name":"sh"}}}'
read line
read line
echo '{"jsonrpc":"2.0","method":"notifications/message","params":{"level":"info"}}'
echo '{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"echo","description":"Echo","inputSchema":{"type":"object","properties":{"text":{"type":"string"}}}}]}}'
read line
echo 'not json at all'
echo '{"jsonrpc":"2.0","id":3,"result":{"content":[{"type":"text","text":"hello from sh"}],"isError":false}}'
read line
"#;

#[tokio::test]
async fn test_real_subprocess_end_to_end() {
    let dir = std::env::temp_dir().join(format!("ai_test_mcp_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let script = dir.join("server.sh");
    std::fs::write(&script, SH_SERVER).unwrap();

    let mut renderer = RecordingRenderer::default();
    let commands = vec![format!("sh {}", script.display())];
    let registry = ToolRegistry::connect(&commands, &mut renderer)
        .await
        .unwrap();
    assert_eq!(registry.names(), vec!["echo"]);

    let out = registry
        .execute("echo", r#"{"text":"hello"}"#)
        .await
        .unwrap();
    assert_eq!(out, "hello from sh");

    registry.close().await;
    let _ = std::fs::remove_dir_all(&dir);
}
