//! End-to-end conformance tests for the chainrpc JSON-RPC endpoint.
//!
//! Each test spawns an ephemeral in-process node (real TCP, real HTTP) via
//! [`chainrpc_conformance::spawn_node`] and exercises the endpoint with a
//! `reqwest` HTTP client or a `tokio-tungstenite` WebSocket client.
//!
//! # Coverage
//!
//! | Test | Behavior |
//! |------|----------|
//! | `dotted_call_returns_handler_result` | `api.method` grammar |
//! | `legacy_call_forms_reach_the_same_handler` | positional `call` grammar |
//! | `three_segment_method_names_the_network` | `network.api.method` grammar |
//! | `list_methods_is_sorted` | catalog |
//! | `get_signature_returns_registered_signature` | catalog |
//! | `wrong_version_is_invalid_request` | envelope validation |
//! | `object_id_is_reported_without_id` | envelope validation |
//! | `empty_batch_is_single_error` | batching |
//! | `batch_responses_keep_request_order` | batching |
//! | `unknown_network_is_method_not_found` | routing |
//! | `uninstalled_api_disappears` | registration |
//! | `unknown_api_is_forwarded_to_remote` | remote delegation |
//! | `remote_failure_is_error_during_call` | remote delegation |
//! | `websocket_pushes_notices_before_response` | notifications |
//! | `fixture_capture_writes_cases_and_manifest` | fixture capture |

use chainrpc::{codes, handler, CallError, Signature};
use chainrpc_conformance::{spawn_node, spawn_node_with};
use chainrpc_node::NodeConfig;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .unwrap()
}

async fn post_raw(base: &str, body: &str) -> Value {
    let resp = make_client()
        .post(format!("{base}/rpc"))
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

async fn post(base: &str, body: Value) -> Value {
    post_raw(base, &body.to_string()).await
}

fn request(method: &str, params: Value) -> Value {
    json!({ "jsonrpc": "2.0", "method": method, "params": params, "id": 1 })
}

// ---------------------------------------------------------------------------
// Grammars
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dotted_call_returns_handler_result() {
    let (base, _) = spawn_node().await;
    let body = post(&base, request("node.add", json!([20, 22]))).await;
    assert_eq!(body, json!({ "jsonrpc": "2.0", "result": 42, "id": 1 }));
}

#[tokio::test]
async fn legacy_call_forms_reach_the_same_handler() {
    let (base, _) = spawn_node().await;

    let body = post(&base, request("call", json!(["node", "ping"]))).await;
    assert_eq!(body["result"], "pong");

    let body = post(&base, request("call", json!(["mainnet", "node", "ping"]))).await;
    assert_eq!(body["result"], "pong");

    let body = post(&base, request("call", json!(["node", "add", [1, 2]]))).await;
    assert_eq!(body["result"], 3);

    let body = post(
        &base,
        request("call", json!(["mainnet", "node", "echo", { "k": "v" }])),
    )
    .await;
    assert_eq!(body["result"], json!({ "k": "v" }));

    let body = post(&base, json!({ "jsonrpc": "2.0", "method": "call", "id": 1 })).await;
    assert_eq!(body["error"]["code"], codes::NO_PARAMS);
}

#[tokio::test]
async fn three_segment_method_names_the_network() {
    let (base, _) = spawn_node().await;
    let body = post(&base, request("mainnet.node.ping", json!({}))).await;
    assert_eq!(body["result"], "pong");

    let body = post(&base, request("a.b.c.d", json!({}))).await;
    assert_eq!(body["error"]["code"], codes::PARSE_PARAMS_ERROR);
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_methods_is_sorted() {
    let (base, _) = spawn_node().await;
    let body = post(&base, request("jsonrpc.list_methods", json!({}))).await;
    let names: Vec<String> = serde_json::from_value(body["result"].clone()).unwrap();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
    assert!(names.contains(&"jsonrpc.get_signature".to_string()));
    assert!(names.contains(&"node.watch".to_string()));

    let alias = post(&base, request("jsonrpc.get_methods", json!([]))).await;
    assert_eq!(alias["result"], body["result"]);
}

#[tokio::test]
async fn get_signature_returns_registered_signature() {
    let (base, _) = spawn_node().await;
    let body = post(
        &base,
        request("jsonrpc.get_signature", json!({ "method": "node.ping" })),
    )
    .await;
    assert_eq!(body["result"], json!({ "args": {}, "ret": "pong" }));

    let body = post(
        &base,
        request("jsonrpc.get_signature", json!({ "method": "node.nope" })),
    )
    .await;
    assert_eq!(body["error"]["code"], codes::ERROR_DURING_CALL);
}

// ---------------------------------------------------------------------------
// Envelope validation and batching
// ---------------------------------------------------------------------------

#[tokio::test]
async fn wrong_version_is_invalid_request() {
    let (base, _) = spawn_node().await;
    let body = post(&base, json!({ "jsonrpc": "1.0", "method": "node.ping", "id": 7 })).await;
    assert_eq!(body["error"]["code"], codes::INVALID_REQUEST);
    assert_eq!(body["id"], 7);
    assert!(body.get("result").is_none());
}

#[tokio::test]
async fn object_id_is_reported_without_id() {
    let (base, _) = spawn_node().await;
    let body = post(
        &base,
        json!({ "jsonrpc": "2.0", "method": "node.ping", "id": { "x": 1 } }),
    )
    .await;
    assert_eq!(body["error"]["code"], codes::INVALID_REQUEST);
    assert!(body.get("id").is_none());
}

#[tokio::test]
async fn empty_batch_is_single_error() {
    let (base, _) = spawn_node().await;
    let body = post_raw(&base, "[]").await;
    assert!(body.is_object());
    assert_eq!(body["error"]["code"], codes::SERVER_ERROR);
}

#[tokio::test]
async fn batch_responses_keep_request_order() {
    let (base, _) = spawn_node().await;
    let body = post(
        &base,
        json!([
            { "jsonrpc": "2.0", "method": "node.echo", "params": "first", "id": "a" },
            { "jsonrpc": "2.0", "method": "node.missing", "id": "b" },
            { "jsonrpc": "2.0", "method": "node.echo", "params": "third", "id": "c" },
        ]),
    )
    .await;
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["result"], "first");
    assert_eq!(items[1]["error"]["code"], codes::METHOD_NOT_FOUND);
    assert_eq!(items[2]["id"], "c");
}

// ---------------------------------------------------------------------------
// Routing and registration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_network_is_method_not_found() {
    let (base, _) = spawn_node().await;
    let body = post(&base, request("node.ping", json!({ "network_id": "testnet" }))).await;
    assert_eq!(body["error"]["code"], codes::METHOD_NOT_FOUND);
}

#[tokio::test]
async fn uninstalled_api_disappears() {
    let (base, service) = spawn_node().await;
    service.install_on("testnet", &chainrpc_node::NodeApi);

    let body = post(&base, request("testnet.node.ping", json!({}))).await;
    assert_eq!(body["result"], "pong");

    service.uninstall("testnet", "node");
    let body = post(&base, request("testnet.node.ping", json!({}))).await;
    assert_eq!(body["error"]["code"], codes::METHOD_NOT_FOUND);
    let body = post(&base, request("jsonrpc.list_methods", json!("testnet"))).await;
    assert_eq!(body["error"]["code"], codes::ERROR_DURING_CALL);
}

// ---------------------------------------------------------------------------
// Remote delegation
// ---------------------------------------------------------------------------

async fn upstream_and_downstream() -> (String, String) {
    let (upstream, upstream_service) = spawn_node().await;
    let registry = upstream_service.registry();
    registry.register(
        "mainnet",
        "wallet",
        "balance",
        handler(|args, _| Ok(json!({ "account": args["account"], "balance": 100 }))),
        Signature::default(),
    );
    registry.register(
        "mainnet",
        "wallet",
        "transfer",
        handler(|_, _| Err(CallError::failed_with("insufficient funds", json!({ "needed": 5 })))),
        Signature::default(),
    );

    let config = NodeConfig {
        remote_url: Some(format!("{upstream}/rpc")),
        ..NodeConfig::default()
    };
    let (downstream, _) = spawn_node_with(config).await;
    (upstream, downstream)
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_api_is_forwarded_to_remote() {
    let (_, downstream) = upstream_and_downstream().await;
    let body = post(&downstream, request("wallet.balance", json!({ "account": "alice" }))).await;
    assert_eq!(body["result"], json!({ "account": "alice", "balance": 100 }));
    assert_eq!(body["id"], 1);

    let body = post(&downstream, request("node.ping", json!({}))).await;
    assert_eq!(body["result"], "pong");
}

#[tokio::test(flavor = "multi_thread")]
async fn remote_failure_is_error_during_call() {
    let (_, downstream) = upstream_and_downstream().await;
    let body = post(&downstream, request("wallet.transfer", json!({}))).await;
    assert_eq!(body["error"]["code"], codes::ERROR_DURING_CALL);
    assert_eq!(body["error"]["message"], "insufficient funds");
    assert_eq!(body["error"]["data"], json!({ "needed": 5 }));

    let body = post(&downstream, request("wallet.missing", json!({}))).await;
    assert_eq!(body["error"]["code"], codes::ERROR_DURING_CALL);
}

// ---------------------------------------------------------------------------
// WebSocket notifications
// ---------------------------------------------------------------------------

#[tokio::test]
async fn websocket_pushes_notices_before_response() {
    let (base, _) = spawn_node().await;
    let url = format!("{}/ws", base.replacen("http://", "ws://", 1));
    let (mut socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();

    let message = json!({
        "jsonrpc": "2.0",
        "method": "node.watch",
        "params": { "count": 2, "value": "block" },
        "id": 5,
    });
    socket.send(Message::text(message.to_string())).await.unwrap();

    let mut frames = Vec::new();
    while frames.len() < 3 {
        let frame = socket.next().await.unwrap().unwrap();
        if frame.is_text() {
            frames.push(serde_json::from_str::<Value>(frame.to_text().unwrap()).unwrap());
        }
    }

    let subscription = frames[2]["result"].clone();
    assert_eq!(frames[2]["id"], 5);
    for (seq, notice) in frames[..2].iter().enumerate() {
        assert_eq!(notice["method"], "notice");
        assert_eq!(notice["params"][0], subscription);
        assert_eq!(notice["params"][1][0]["seq"], seq);
    }
}

// ---------------------------------------------------------------------------
// Fixture capture
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fixture_capture_writes_cases_and_manifest() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("fixtures");
    let config = NodeConfig {
        fixture_dir: Some(dir.clone()),
        ..NodeConfig::default()
    };
    let (base, service) = spawn_node_with(config).await;

    post(&base, request("node.ping", json!({}))).await;
    post(&base, request("node.missing", json!({}))).await;
    service.shutdown();

    let expected: Value =
        serde_json::from_slice(&std::fs::read(dir.join("1.json.pat")).unwrap()).unwrap();
    assert_eq!(expected, "pong");
    let error: Value =
        serde_json::from_slice(&std::fs::read(dir.join("1_error.json.pat")).unwrap()).unwrap();
    assert_eq!(error["code"], codes::METHOD_NOT_FOUND);

    let manifest = std::fs::read_to_string(dir.join("tests.yaml")).unwrap();
    assert!(manifest.contains("name: \"test1\""));
    assert!(manifest.contains("name: \"test1_error\""));
}
