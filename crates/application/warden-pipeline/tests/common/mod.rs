#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use camino::Utf8PathBuf;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use warden_core::{ManualClock, Operation, PayloadShape, RemoteCall, Tenant, TenantCategory};
use warden_persistence::RedbStore;
use warden_pipeline::{CredentialError, CredentialGate, RemoteError, RemoteFetcher, SyncEngine};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("warden_pipeline=debug")
        .try_init();
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
}

pub fn tenant(id: &str, category: TenantCategory) -> Tenant {
    Tenant {
        id: id.into(),
        name: format!("Tenant {id}"),
        token: format!("key-{id}"),
        active: true,
        category,
    }
}

#[derive(Default)]
pub struct StaticCredentials {
    tenants: Mutex<Vec<Tenant>>,
}

impl StaticCredentials {
    pub fn with(tenants: Vec<Tenant>) -> Self {
        Self {
            tenants: Mutex::new(tenants),
        }
    }
}

impl CredentialGate for StaticCredentials {
    fn resolve(&self, tenant_id: &str) -> Result<Tenant, CredentialError> {
        self.tenants
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == tenant_id)
            .cloned()
            .ok_or_else(|| CredentialError::NotFound(tenant_id.to_string()))
    }
}

/// Empty result in the shape the given call returns.
pub fn empty_result(call: RemoteCall) -> Value {
    let shape = Operation::ALL
        .into_iter()
        .find(|op| op.remote_call() == call)
        .map(|op| op.payload_shape());
    match shape {
        Some(PayloadShape::Paged) => json!({"items": [], "page": 1, "pagesCount": 1, "perPage": 100, "total": 0}),
        Some(PayloadShape::List) => json!([]),
        Some(PayloadShape::Single) | None => Value::Null,
    }
}

pub fn paged(items: Value) -> Value {
    let total = items.as_array().map_or(0, Vec::len);
    json!({"items": items, "page": 1, "pagesCount": 1, "perPage": 100, "total": total})
}

/// Fetcher answering from a per-method table; unknown methods get an empty result.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<HashMap<&'static str, Result<Value, RemoteError>>>,
    calls: Mutex<Vec<(String, &'static str, Value)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedFetcher {
    pub fn respond(&self, method: &'static str, result: Value) {
        self.responses.lock().unwrap().insert(method, Ok(result));
    }

    pub fn fail(&self, method: &'static str, error: RemoteError) {
        self.responses.lock().unwrap().insert(method, Err(error));
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn methods(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().iter().map(|(_, m, _)| *m).collect()
    }

    pub fn calls(&self) -> Vec<(String, &'static str, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        tenant: &Tenant,
        call: RemoteCall,
        params: Value,
    ) -> Result<Value, RemoteError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push((tenant.id.clone(), call.method, params));

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.responses.lock().unwrap().get(call.method).cloned();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        scripted.unwrap_or_else(|| Ok(empty_result(call)))
    }
}

pub struct Harness {
    pub _dir: tempfile::TempDir,
    pub store: RedbStore,
    pub fetcher: Arc<ScriptedFetcher>,
    pub clock: Arc<ManualClock>,
    pub engine: SyncEngine,
}

pub fn open_store() -> (tempfile::TempDir, RedbStore) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let store = RedbStore::open_in(&root).unwrap();
    (dir, store)
}

pub fn harness(tenants: Vec<Tenant>) -> Harness {
    init_tracing();
    let (dir, store) = open_store();
    let fetcher = Arc::new(ScriptedFetcher::default());
    let clock = Arc::new(ManualClock::new(start_time()));
    let engine = SyncEngine::new(
        Arc::new(StaticCredentials::with(tenants)),
        fetcher.clone(),
        store.clone(),
        clock.clone(),
    );
    Harness {
        _dir: dir,
        store,
        fetcher,
        clock,
        engine,
    }
}
