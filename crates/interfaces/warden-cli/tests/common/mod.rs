#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path as FsPath;
use std::sync::{Arc, Mutex};

use axum::extract::Path;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use camino::Utf8PathBuf;
use serde_json::{json, Value};
use warden_core::{Tenant, TenantCategory};
use warden_infra::FileTenantRegistry;

/// Basic-auth header value of the key `broken-key`; its accounts listing always fails.
const BROKEN_KEY_AUTH: &str = "Basic YnJva2VuLWtleTo=";

pub type CallLog = Arc<Mutex<Vec<(String, String, Value)>>>;

pub struct MockRemote {
    pub addr: SocketAddr,
    pub log: CallLog,
    handle: tokio::task::JoinHandle<()>,
}

impl MockRemote {
    pub fn api_url(&self) -> String {
        format!("http://{}/jsonrpc", self.addr)
    }

    pub fn methods(&self) -> Vec<String> {
        self.log.lock().unwrap().iter().map(|(_, m, _)| m.clone()).collect()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, m, _)| m == method)
            .map(|(_, _, p)| p.clone())
            .collect()
    }
}

impl Drop for MockRemote {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn result_for(method: &str) -> Value {
    match method {
        "getLicenseInfo" => json!({
            "licenseKey": "LIC-1",
            "subscriptionType": 3,
            "usedSlots": 5,
            "totalSlots": 50
        }),
        "getCompanyDetails" => json!({"id": "c1", "name": "Acme"}),
        "getCustomGroupsList" => json!([
            {"id": "g1", "name": "Servers"},
            {"id": "g2", "name": "Laptops", "parentId": "g1"}
        ]),
        "getInstallationLinks" => json!([]),
        "deleteCustomGroup" | "deletePackage" => Value::Null,
        _ => json!({"items": [], "page": 1, "pagesCount": 1, "perPage": 100, "total": 0}),
    }
}

pub async fn start_mock_remote() -> MockRemote {
    let log: CallLog = Arc::default();
    let recorded = log.clone();
    let app = Router::new().route(
        "/jsonrpc/*service",
        post(
            move |headers: HeaderMap, Path(service): Path<String>, Json(body): Json<Value>| {
                let log = recorded.clone();
                async move {
                    let method = body["method"].as_str().unwrap_or_default().to_string();
                    log.lock()
                        .unwrap()
                        .push((service, method.clone(), body["params"].clone()));

                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default();
                    if auth == BROKEN_KEY_AUTH && method == "getAccountsList" {
                        return Json(json!({
                            "id": body["id"],
                            "jsonrpc": "2.0",
                            "error": {"code": -32000, "message": "Server error", "data": {"details": "accounts offline"}}
                        }));
                    }
                    Json(json!({"id": body["id"], "jsonrpc": "2.0", "result": result_for(&method)}))
                }
            },
        ),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    MockRemote { addr, log, handle }
}

pub fn tenant(id: &str, token: &str, category: TenantCategory) -> Tenant {
    Tenant {
        id: id.into(),
        name: format!("Tenant {id}"),
        token: token.into(),
        active: true,
        category,
    }
}

pub fn registry_with(dir: &FsPath, tenants: Vec<Tenant>) -> FileTenantRegistry {
    let registry = FileTenantRegistry::in_dir(dir);
    for t in tenants {
        registry.add(t).unwrap();
    }
    registry
}

pub fn utf8(dir: &FsPath) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.to_path_buf()).unwrap()
}
