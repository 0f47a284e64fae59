#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end behaviour of `ToolClient` against a stubbed tool server.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use {
    async_trait::async_trait,
    mockito::{Matcher, Server, ServerGuard},
    serde_json::json,
    tokio_test::{assert_err, assert_ok},
    tollgate_mcp::{
        FailureKind, ToolAllowList, ToolCallResult, ToolClient, ToolClientConfig, ToolInvoker,
        TokenProvider,
    },
    tollgate_oauth::{AccessToken, TokenCredential, unix_now},
    url::Url,
};

/// Issues `token-1`, `token-2`, ... valid for an hour.
#[derive(Default)]
struct SequenceCredential {
    issued: AtomicUsize,
}

#[async_trait]
impl TokenCredential for SequenceCredential {
    fn name(&self) -> &'static str {
        "sequence"
    }

    async fn get_token(&self, _scope: &str) -> tollgate_oauth::Result<AccessToken> {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(AccessToken::new(format!("token-{n}"), unix_now() + 3600))
    }
}

struct NoCredential;

#[async_trait]
impl TokenCredential for NoCredential {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn get_token(&self, _scope: &str) -> tollgate_oauth::Result<AccessToken> {
        Err(tollgate_oauth::Error::unavailable(
            "chain",
            "environment unavailable: not set",
        ))
    }
}

/// Matches `/message` with or without a query string.
fn message_path() -> Matcher {
    Matcher::Regex(r"^/message(\?.*)?$".into())
}

fn config_for(server: &ServerGuard) -> ToolClientConfig {
    let endpoint = Url::parse(&format!("{}/message", server.url())).unwrap();
    let mut config = ToolClientConfig::new(endpoint);
    config.session_affinity = false;
    config
}

fn client_with(config: ToolClientConfig) -> ToolClient {
    let tokens = TokenProvider::new(Arc::new(SequenceCredential::default()), "api://tools/.default");
    ToolClient::new(config, Arc::new(tokens)).unwrap()
}

/// JSON-RPC body whose `id` echoes the request, holding `text` as the only
/// content entry.
fn text_result(text: &str) -> impl Fn(&mockito::Request) -> Vec<u8> + Send + Sync + 'static {
    let text = text.to_string();
    move |req: &mockito::Request| {
        let body: serde_json::Value = serde_json::from_slice(req.body().unwrap()).unwrap();
        json!({
            "jsonrpc": "2.0",
            "id": body["id"],
            "result": { "content": [{ "type": "text", "text": text }] }
        })
        .to_string()
        .into_bytes()
    }
}

#[tokio::test]
async fn success_decodes_text_payload() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", message_path())
        .match_header("authorization", "Bearer token-1")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "jsonrpc": "2.0",
            "method": "tools/call",
            "params": { "name": "list_tables", "arguments": {} }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body_from_request(text_result(r#"[{"id":1}]"#))
        .create_async()
        .await;

    let client = client_with(config_for(&server));
    let result = client.call_tool("list_tables", json!({})).await;

    assert_eq!(result, ToolCallResult::Success {
        payload: json!([{ "id": 1 }])
    });
    mock.assert_async().await;
}

#[tokio::test]
async fn cached_token_serves_many_calls() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", message_path())
        .match_header("authorization", "Bearer token-1")
        .with_status(200)
        .with_body_from_request(text_result("[]"))
        .expect(3)
        .create_async()
        .await;

    let client = client_with(config_for(&server));
    for _ in 0..3 {
        assert!(client.call_tool("list_tables", json!({})).await.is_success());
    }
    assert_eq!(client.tokens().acquisitions(), 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn unauthorized_then_success_retries_once_with_fresh_token() {
    let mut server = Server::new_async().await;
    let rejected = server
        .mock("POST", message_path())
        .match_header("authorization", "Bearer token-1")
        .with_status(401)
        .with_body("token expired")
        .expect(1)
        .create_async()
        .await;
    let accepted = server
        .mock("POST", message_path())
        .match_header("authorization", "Bearer token-2")
        .with_status(200)
        .with_body_from_request(text_result(r#"["TableA","TableB"]"#))
        .expect(1)
        .create_async()
        .await;

    let client = client_with(config_for(&server));
    let result = client.call_tool("list_tables", json!({})).await;

    assert_eq!(result.payload(), Some(&json!(["TableA", "TableB"])));
    assert_eq!(client.tokens().acquisitions(), 2);
    rejected.assert_async().await;
    accepted.assert_async().await;
}

#[tokio::test]
async fn second_unauthorized_is_surfaced_without_further_retry() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", message_path())
        .with_status(401)
        .with_body("nope")
        .expect(2)
        .create_async()
        .await;

    let client = client_with(config_for(&server));
    let result = client.call_tool("list_tables", json!({})).await;

    let failure = result.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::Unauthorized);
    assert_eq!(failure.raw_status, Some(401));
    assert_eq!(client.tokens().acquisitions(), 2);
    mock.assert_async().await;
}

#[tokio::test]
async fn forbidden_is_never_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", message_path())
        .with_status(403)
        .with_body("row-level security denied access")
        .expect(1)
        .create_async()
        .await;

    let client = client_with(config_for(&server));
    let result = client.call_tool("list_tables", json!({})).await;

    let failure = result.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::Forbidden);
    assert!(failure.message.contains("row-level security"));
    assert_eq!(client.tokens().acquisitions(), 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn not_found_status() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", message_path())
        .with_status(404)
        .create_async()
        .await;

    let client = client_with(config_for(&server));
    let result = client.call_tool("list_tables", json!({})).await;
    assert_eq!(result.kind(), Some(FailureKind::NotFound));
}

#[tokio::test]
async fn malformed_json_is_protocol_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", message_path())
        .with_status(200)
        .with_body("<html>gateway says hi</html>")
        .create_async()
        .await;

    let client = client_with(config_for(&server));
    let failure = client
        .call_tool("list_tables", json!({}))
        .await
        .failure()
        .cloned()
        .unwrap();
    assert_eq!(failure.kind, FailureKind::ProtocolError);
    assert_eq!(failure.raw_status, Some(200));
    assert!(failure.message.contains("gateway says hi"));
}

#[tokio::test]
async fn unexpected_status_excerpt_is_truncated() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", message_path())
        .with_status(502)
        .with_body("x".repeat(1000))
        .create_async()
        .await;

    let client = client_with(config_for(&server));
    let failure = client
        .call_tool("list_tables", json!({}))
        .await
        .failure()
        .cloned()
        .unwrap();
    assert_eq!(failure.kind, FailureKind::ProtocolError);
    assert_eq!(failure.raw_status, Some(502));
    let excerpt = failure.message.rsplit(": ").next().unwrap();
    assert_eq!(excerpt, "x".repeat(200));
    assert!(failure.message.starts_with("unexpected HTTP status 502"));
}

#[tokio::test]
async fn method_not_found_maps_to_not_found() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", message_path())
        .with_status(200)
        .with_body_from_request(|req| {
            let body: serde_json::Value = serde_json::from_slice(req.body().unwrap()).unwrap();
            json!({
                "jsonrpc": "2.0",
                "id": body["id"],
                "error": { "code": -32601, "message": "Unknown tool: drop_table" }
            })
            .to_string()
            .into_bytes()
        })
        .create_async()
        .await;

    let client = client_with(config_for(&server));
    let failure = client
        .call_tool("drop_table", json!({}))
        .await
        .failure()
        .cloned()
        .unwrap();
    assert_eq!(failure.kind, FailureKind::NotFound);
    assert!(failure.message.contains("Unknown tool: drop_table"));
}

#[tokio::test]
async fn other_rpc_errors_are_protocol_errors() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", message_path())
        .with_status(200)
        .with_body_from_request(|req| {
            let body: serde_json::Value = serde_json::from_slice(req.body().unwrap()).unwrap();
            json!({
                "jsonrpc": "2.0",
                "id": body["id"],
                "error": { "code": -32602, "message": "Invalid params" }
            })
            .to_string()
            .into_bytes()
        })
        .create_async()
        .await;

    let client = client_with(config_for(&server));
    let result = client.call_tool("list_tables", json!({"x": 1})).await;
    assert_eq!(result.kind(), Some(FailureKind::ProtocolError));
}

#[tokio::test]
async fn mismatched_response_id_is_protocol_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", message_path())
        .with_status(200)
        .with_body(r#"{"jsonrpc":"2.0","id":0,"result":{"content":[{"type":"text","text":"[]"}]}}"#)
        .create_async()
        .await;

    let client = client_with(config_for(&server));
    let failure = client
        .call_tool("list_tables", json!({}))
        .await
        .failure()
        .cloned()
        .unwrap();
    assert_eq!(failure.kind, FailureKind::ProtocolError);
    assert!(failure.message.contains("does not match"));
}

#[tokio::test]
async fn event_stream_response_is_accepted() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", message_path())
        .match_header("accept", "application/json, text/event-stream")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body_from_request(|req| {
            let body: serde_json::Value = serde_json::from_slice(req.body().unwrap()).unwrap();
            let frame = json!({
                "jsonrpc": "2.0",
                "id": body["id"],
                "result": { "content": [{ "type": "text", "text": "{\"rows\":2}" }] }
            });
            format!("event: message\ndata: {frame}\n\n").into_bytes()
        })
        .create_async()
        .await;

    let client = client_with(config_for(&server));
    let result = client.call_tool("count_rows", json!({})).await;
    assert_eq!(result.payload(), Some(&json!({ "rows": 2 })));
}

#[tokio::test]
async fn tool_error_flag_is_reported() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", message_path())
        .with_status(200)
        .with_body_from_request(|req| {
            let body: serde_json::Value = serde_json::from_slice(req.body().unwrap()).unwrap();
            json!({
                "jsonrpc": "2.0",
                "id": body["id"],
                "result": { "content": [{ "type": "text", "text": "relation does not exist" }], "isError": true }
            })
            .to_string()
            .into_bytes()
        })
        .create_async()
        .await;

    let client = client_with(config_for(&server));
    let failure = client
        .call_tool("describe_table", json!({"table": "missing"}))
        .await
        .failure()
        .cloned()
        .unwrap();
    assert_eq!(failure.kind, FailureKind::ToolError);
    assert_eq!(failure.message, "relation does not exist");
}

#[tokio::test]
async fn session_affinity_adds_session_id() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", message_path())
        .match_query(Matcher::Regex(
            r"sessionId=[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}".into(),
        ))
        .with_status(200)
        .with_body_from_request(text_result("[]"))
        .create_async()
        .await;

    let mut config = config_for(&server);
    config.session_affinity = true;
    let client = client_with(config);
    assert!(client.call_tool("list_tables", json!({})).await.is_success());
    mock.assert_async().await;
}

#[tokio::test]
async fn allow_list_denial_makes_no_request() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", message_path())
        .expect(0)
        .create_async()
        .await;

    let mut config = config_for(&server);
    config.allow_list = ToolAllowList::from_iter(["list_tables"]);
    let client = client_with(config);

    let result = client.call_tool("drop_table", json!({})).await;
    assert_eq!(result.kind(), Some(FailureKind::Forbidden));
    assert_eq!(client.tokens().acquisitions(), 0);
    mock.assert_async().await;
}

#[tokio::test]
async fn credential_failure_makes_no_request() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", message_path())
        .expect(0)
        .create_async()
        .await;

    let tokens = TokenProvider::new(Arc::new(NoCredential), "scope");
    let client = ToolClient::new(config_for(&server), Arc::new(tokens)).unwrap();
    let failure = client
        .call_tool("list_tables", json!({}))
        .await
        .failure()
        .cloned()
        .unwrap();
    assert_eq!(failure.kind, FailureKind::Credential);
    assert!(failure.message.contains("environment unavailable"));
    mock.assert_async().await;
}

#[tokio::test]
async fn connection_refused_is_transport_error() {
    let config = ToolClientConfig::new(Url::parse("http://127.0.0.1:1/message").unwrap());
    let client = client_with(config);
    let failure = client
        .call_tool("list_tables", json!({}))
        .await
        .failure()
        .cloned()
        .unwrap();
    assert_eq!(failure.kind, FailureKind::TransportError);
    assert!(failure.kind.is_retryable());
    assert_eq!(failure.raw_status, None);
}

#[tokio::test]
async fn list_tools_follows_cursor_and_filters() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", message_path())
        .match_body(Matcher::PartialJson(json!({ "method": "tools/list" })))
        .with_status(200)
        .with_body_from_request(|req| {
            let body: serde_json::Value = serde_json::from_slice(req.body().unwrap()).unwrap();
            let result = if body["params"]["cursor"] == "page-2" {
                json!({ "tools": [{ "name": "drop_table" }] })
            } else {
                json!({
                    "tools": [
                        { "name": "list_tables", "description": "List tables", "inputSchema": { "type": "object" } },
                        { "name": "describe_table" }
                    ],
                    "nextCursor": "page-2"
                })
            };
            json!({ "jsonrpc": "2.0", "id": body["id"], "result": result })
                .to_string()
                .into_bytes()
        })
        .expect(2)
        .create_async()
        .await;

    let mut config = config_for(&server);
    config.allow_list = ToolAllowList::from_iter(["list_tables", "drop_table"]);
    let client = client_with(config);

    let tools = assert_ok!(ToolInvoker::list_tools(&client).await);
    let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["list_tables", "drop_table"]);
}

#[tokio::test]
async fn list_tools_surfaces_forbidden() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", message_path())
        .with_status(403)
        .create_async()
        .await;

    let client = client_with(config_for(&server));
    let failure = assert_err!(client.list_tools().await);
    assert_eq!(failure.kind, FailureKind::Forbidden);
}

#[tokio::test]
async fn list_tools_rejects_cycling_cursor() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", message_path())
        .with_status(200)
        .with_body_from_request(|req| {
            let body: serde_json::Value = serde_json::from_slice(req.body().unwrap()).unwrap();
            let next = if body["params"]["cursor"] == "a" { "b" } else { "a" };
            json!({
                "jsonrpc": "2.0",
                "id": body["id"],
                "result": { "tools": [{ "name": "list_tables" }], "nextCursor": next }
            })
            .to_string()
            .into_bytes()
        })
        .expect(3)
        .create_async()
        .await;

    let client = client_with(config_for(&server));
    let listing = tokio::time::timeout(std::time::Duration::from_secs(5), client.list_tools())
        .await
        .expect("paging should stop on a repeated cursor");
    let failure = assert_err!(listing);
    assert_eq!(failure.kind, FailureKind::ProtocolError);
    assert!(failure.message.contains("cursor 'a'"), "{}", failure.message);
    mock.assert_async().await;
}
