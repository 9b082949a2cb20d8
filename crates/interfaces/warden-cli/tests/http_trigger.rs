mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use common::{registry_with, start_mock_remote, tenant, utf8};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use warden_cli::{build_engine, server};
use warden_core::{Tenant, TenantCategory};

struct Trigger {
    addr: SocketAddr,
    shutdown: CancellationToken,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
    http: reqwest::Client,
}

impl Trigger {
    async fn start(api_url: &str, dir: &std::path::Path, tenants: Vec<Tenant>) -> Self {
        let registry = registry_with(dir, tenants);
        let engine = Arc::new(build_engine(api_url, registry, &utf8(dir)).unwrap());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(server::serve(listener, engine, shutdown.clone()));
        Self {
            addr,
            shutdown,
            handle,
            http: reqwest::Client::new(),
        }
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .http
            .post(format!("http://{}{}", self.addr, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        (resp.status().as_u16(), resp.json().await.unwrap())
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self
            .http
            .get(format!("http://{}{}", self.addr, path))
            .send()
            .await
            .unwrap();
        (resp.status().as_u16(), resp.json().await.unwrap())
    }
}

#[tokio::test]
async fn sync_all_status_and_clear_history() {
    let remote = start_mock_remote().await;
    let dir = tempfile::tempdir().unwrap();
    let trigger = Trigger::start(
        &remote.api_url(),
        dir.path(),
        vec![tenant("p1", "good-key", TenantCategory::ProductOnly)],
    )
    .await;

    let (status, body) = trigger.post("/sync/all", json!({"apiKeyId": "p1"})).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["countsPerCategory"], json!({"licenses": 1}));

    // Fresh: nothing runs, the summary is empty.
    let (status, body) = trigger.post("/sync/all", json!({"apiKeyId": "p1"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["countsPerCategory"], json!({}));
    assert_eq!(remote.calls_to("getLicenseInfo").len(), 1);

    let (status, body) = trigger.get("/sync/status/p1").await;
    assert_eq!(status, 200);
    let ops = body["data"]["operations"].as_array().unwrap();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0]["operation"], "licenses");
    assert_eq!(ops[0]["due"], false);
    assert!(!ops[0]["last_sync"].is_null());
    assert!(!body["data"]["last_full_sync"].is_null());

    let (status, body) = trigger
        .post("/sync/clear-history", json!({"apiKeyId": "p1"}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);

    let (_, body) = trigger.get("/sync/status/p1").await;
    assert!(body["data"]["operations"][0]["last_sync"].is_null());
    assert_eq!(body["data"]["operations"][0]["due"], true);

    // Forced pass after a clear runs again.
    let (status, body) = trigger
        .post("/sync/all", json!({"apiKeyId": "p1", "force": true}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["countsPerCategory"]["licenses"], 1);
    assert_eq!(remote.calls_to("getLicenseInfo").len(), 2);

    trigger.shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), trigger.handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn errors_use_the_error_envelope() {
    let remote = start_mock_remote().await;
    let dir = tempfile::tempdir().unwrap();
    let mut inactive = tenant("off", "good-key", TenantCategory::ProductOnly);
    inactive.active = false;
    let trigger = Trigger::start(
        &remote.api_url(),
        dir.path(),
        vec![
            inactive,
            tenant("b1", "broken-key", TenantCategory::FullService),
        ],
    )
    .await;

    let (status, body) = trigger.post("/sync/all", json!({"apiKeyId": "nobody"})).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "TENANT_NOT_FOUND");

    let (status, body) = trigger.post("/sync/all", json!({"apiKeyId": "off"})).await;
    assert_eq!(status, 403);
    assert_eq!(body["error"]["code"], "TENANT_INACTIVE");

    let (status, body) = trigger.post("/sync/all", json!({"tenant": "b1"})).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");

    let (status, body) = trigger.post("/sync/all", json!({"apiKeyId": " "})).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");

    let (status, body) = trigger.post("/sync/all", json!({"apiKeyId": "b1"})).await;
    assert_eq!(status, 502);
    assert_eq!(body["error"]["code"], "SYNC_FAILED");
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("accounts"), "{message}");

    let (status, body) = trigger.get("/sync/status/nobody").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "TENANT_NOT_FOUND");

    assert!(remote.calls_to("getLicenseInfo").is_empty());
}
