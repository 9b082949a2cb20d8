use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use warden_core::Operation;
use warden_infra::{JsonRpcClient, RpcError};

// base64("key-1:")
const EXPECTED_AUTH: &str = "Basic a2V5LTE6";

type Seen = Arc<Mutex<Vec<Value>>>;

async fn network(seen: Seen, headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    seen.lock().unwrap().push(body.clone());
    let id = body.get("id").cloned().unwrap_or(Value::Null);

    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some(EXPECTED_AUTH) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"id": id, "jsonrpc": "2.0", "error": {"code": -32001, "message": "Unauthorized"}})),
        );
    }

    match body.get("method").and_then(Value::as_str) {
        Some("getEndpointsList") => (
            StatusCode::OK,
            Json(json!({
                "id": id,
                "jsonrpc": "2.0",
                "result": {"page": 1, "pagesCount": 1, "perPage": 100, "total": 1,
                           "items": [{"id": "e1", "name": "alpha"}]}
            })),
        ),
        _ => (
            StatusCode::OK,
            Json(json!({
                "id": id,
                "jsonrpc": "2.0",
                "error": {"code": -32601, "message": "Method not found", "data": {"details": "no such method"}}
            })),
        ),
    }
}

async fn start_server() -> (SocketAddr, Seen, tokio::task::JoinHandle<()>) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let route_seen = seen.clone();
    let app = Router::new()
        .route(
            "/api/network",
            post(move |headers: HeaderMap, body: Json<Value>| {
                let seen = route_seen.clone();
                network(seen, headers, body)
            }),
        )
        .route(
            "/api/broken",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, seen, handle)
}

#[tokio::test]
async fn posts_jsonrpc_envelope_with_basic_auth() {
    let (addr, seen, handle) = start_server().await;
    let client = JsonRpcClient::new(format!("http://{addr}/api")).unwrap();

    let params = json!({"page": 1, "perPage": 100});
    let result = client
        .call("t1", "key-1", Operation::Endpoints.remote_call(), &params)
        .await
        .unwrap();
    assert_eq!(result["items"][0]["id"], "e1");

    let requests = seen.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["jsonrpc"], "2.0");
    assert_eq!(requests[0]["method"], "getEndpointsList");
    assert_eq!(requests[0]["params"], params);
    assert!(requests[0]["id"].as_str().is_some_and(|s| !s.is_empty()));

    handle.abort();
}

#[tokio::test]
async fn rpc_error_object_is_surfaced() {
    let (addr, _seen, handle) = start_server().await;
    let client = JsonRpcClient::new(format!("http://{addr}/api")).unwrap();

    let err = client
        .call("t1", "key-1", Operation::CustomGroups.remote_call(), &json!({}))
        .await
        .unwrap_err();
    match err {
        RpcError::Rpc { status, error } => {
            assert_eq!(status, 200);
            assert_eq!(error.code, -32601);
            assert_eq!(error.details(), Some("no such method"));
        }
        other => panic!("unexpected {other:?}"),
    }

    handle.abort();
}

#[tokio::test]
async fn wrong_key_is_rejected_with_status() {
    let (addr, _seen, handle) = start_server().await;
    let client = JsonRpcClient::new(format!("http://{addr}/api")).unwrap();

    let err = client
        .call("t1", "wrong", Operation::Endpoints.remote_call(), &json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), Some(401));
    assert_eq!(err.rpc_code(), Some(-32001));

    handle.abort();
}

#[tokio::test]
async fn non_json_gateway_error_is_http_error() {
    let (addr, _seen, handle) = start_server().await;
    let client = JsonRpcClient::new(format!("http://{addr}/api")).unwrap();

    let call = warden_core::RemoteCall {
        service: "broken",
        method: "anything",
    };
    let err = client.call("t1", "key-1", call, &json!({})).await.unwrap_err();
    match err {
        RpcError::Http { status, message } => {
            assert_eq!(status, 502);
            assert_eq!(message, "upstream down");
        }
        other => panic!("unexpected {other:?}"),
    }

    handle.abort();
}
