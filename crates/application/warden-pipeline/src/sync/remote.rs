//! Ports to the outside world: the remote API and the credential source.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use warden_core::formats::PagedResult;
use warden_core::{RemoteCall, Tenant};
use warden_infra::{FileTenantRegistry, JsonRpcClient, RpcError};

use crate::sync::OperationError;

/// A failed remote call. Every variant of failure means "this operation failed".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (http {}, code {})", fmt_opt(.http_status), fmt_opt(.code))]
pub struct RemoteError {
    pub http_status: Option<u16>,
    pub code: Option<i64>,
    pub message: String,
}

fn fmt_opt<T: std::fmt::Display>(v: &Option<T>) -> String {
    v.as_ref().map_or_else(|| "-".to_string(), ToString::to_string)
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            http_status: None,
            code: None,
            message: message.into(),
        }
    }
}

impl From<RpcError> for RemoteError {
    fn from(err: RpcError) -> Self {
        let message = match &err {
            RpcError::Rpc { error, .. } => match error.details() {
                Some(details) => format!("{}: {details}", error.message),
                None => error.message.clone(),
            },
            other => other.to_string(),
        };
        Self {
            http_status: err.http_status(),
            code: err.rpc_code(),
            message,
        }
    }
}

/// Performs one remote call on behalf of a tenant and returns its decoded result.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    async fn fetch(
        &self,
        tenant: &Tenant,
        call: RemoteCall,
        params: Value,
    ) -> Result<Value, RemoteError>;
}

/// [`RemoteFetcher`] over the JSON-RPC HTTP client.
pub struct RpcRemoteFetcher {
    client: JsonRpcClient,
}

impl RpcRemoteFetcher {
    pub fn new(client: JsonRpcClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteFetcher for RpcRemoteFetcher {
    async fn fetch(
        &self,
        tenant: &Tenant,
        call: RemoteCall,
        params: Value,
    ) -> Result<Value, RemoteError> {
        self.client
            .call(&tenant.id, &tenant.token, call, &params)
            .await
            .map_err(RemoteError::from)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("tenant {0} not found")]
    NotFound(String),
    #[error("{0}")]
    Unavailable(String),
}

/// Resolves a tenant id to its access token and active flag.
pub trait CredentialGate: Send + Sync {
    fn resolve(&self, tenant_id: &str) -> Result<Tenant, CredentialError>;
}

impl CredentialGate for FileTenantRegistry {
    fn resolve(&self, tenant_id: &str) -> Result<Tenant, CredentialError> {
        self.find(tenant_id)
            .map_err(|e| CredentialError::Unavailable(e.to_string()))?
            .ok_or_else(|| CredentialError::NotFound(tenant_id.to_string()))
    }
}

/// A tenant's view of the remote side for the duration of one pass. Every call
/// races the pass's cancellation token.
#[derive(Clone, Copy)]
pub struct RemoteSession<'a> {
    fetcher: &'a dyn RemoteFetcher,
    tenant: &'a Tenant,
    cancel: &'a CancellationToken,
}

impl<'a> RemoteSession<'a> {
    pub fn new(
        fetcher: &'a dyn RemoteFetcher,
        tenant: &'a Tenant,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            tenant,
            cancel,
        }
    }

    pub async fn call(&self, call: RemoteCall, params: Value) -> Result<Value, OperationError> {
        if self.cancel.is_cancelled() {
            return Err(OperationError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(OperationError::Cancelled),
            res = self.fetcher.fetch(self.tenant, call, params) => res.map_err(OperationError::Remote),
        }
    }

    pub async fn call_as<T: for<'de> Deserialize<'de>>(
        &self,
        call: RemoteCall,
        params: Value,
    ) -> Result<T, OperationError> {
        let value = self.call(call, params).await?;
        serde_json::from_value(value)
            .map_err(|e| OperationError::Payload(format!("{}: {e}", call.method)))
    }

    /// Fetches every page of a paged listing. Pages start at 1 and continue while
    /// `page < pagesCount`; a failure on any page fails the whole listing.
    pub async fn fetch_all_pages(&self, call: RemoteCall) -> Result<Vec<Value>, OperationError> {
        let per_page = warden_config::clamp_page_size(warden_config::DEFAULT_PAGE_SIZE);
        let mut items = Vec::new();
        let mut page: u32 = 1;
        loop {
            let params = json!({ "page": page, "perPage": per_page });
            let mut result: PagedResult = self.call_as(call, params).await?;
            if result.page == 0 {
                result.page = page;
            }
            tracing::trace!(
                method = call.method,
                page,
                pages_count = result.pages_count,
                items = result.items.len(),
                "page fetched"
            );
            let more = result.has_more();
            items.extend(result.items);
            if !more {
                break;
            }
            page += 1;
        }
        Ok(items)
    }

    /// Fetches a listing returned as a bare array. An `{ items }` object is accepted too.
    pub async fn fetch_list(&self, call: RemoteCall) -> Result<Vec<Value>, OperationError> {
        match self.call(call, json!({})).await? {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            Value::Object(mut obj) => match obj.remove("items") {
                Some(Value::Array(items)) => Ok(items),
                _ => Err(OperationError::Payload(format!(
                    "{}: expected an array",
                    call.method
                ))),
            },
            _ => Err(OperationError::Payload(format!(
                "{}: expected an array",
                call.method
            ))),
        }
    }

    /// Fetches a single-object result; `null` means nothing to store.
    pub async fn fetch_single(&self, call: RemoteCall) -> Result<Vec<Value>, OperationError> {
        match self.call(call, json!({})).await? {
            Value::Null => Ok(Vec::new()),
            value @ Value::Object(_) => Ok(vec![value]),
            _ => Err(OperationError::Payload(format!(
                "{}: expected an object",
                call.method
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Pages {
        seen: Mutex<Vec<Value>>,
        pages_count: u32,
    }

    #[async_trait]
    impl RemoteFetcher for Pages {
        async fn fetch(&self, _: &Tenant, _: RemoteCall, params: Value) -> Result<Value, RemoteError> {
            self.seen.lock().unwrap().push(params.clone());
            let page = params["page"].as_u64().unwrap();
            Ok(json!({
                "items": [{"id": format!("p{page}")}],
                "page": page,
                "pagesCount": self.pages_count,
                "perPage": 100,
                "total": self.pages_count,
            }))
        }
    }

    fn tenant() -> Tenant {
        Tenant {
            id: "t1".into(),
            name: "Acme".into(),
            token: "k".into(),
            active: true,
            category: Default::default(),
        }
    }

    #[tokio::test]
    async fn pages_until_pages_count() {
        let fetcher = Pages {
            seen: Mutex::new(Vec::new()),
            pages_count: 3,
        };
        let tenant = tenant();
        let cancel = CancellationToken::new();
        let session = RemoteSession::new(&fetcher, &tenant, &cancel);

        let call = warden_core::Operation::Endpoints.remote_call();
        let items = session.fetch_all_pages(call).await.unwrap();
        assert_eq!(items.len(), 3);

        let seen = fetcher.seen.lock().unwrap();
        let pages: Vec<_> = seen.iter().map(|p| p["page"].as_u64().unwrap()).collect();
        assert_eq!(pages, vec![1, 2, 3]);
        assert!(seen.iter().all(|p| p["perPage"] == 100));
    }

    #[tokio::test]
    async fn empty_listing_is_one_call() {
        let fetcher = Pages {
            seen: Mutex::new(Vec::new()),
            pages_count: 0,
        };
        let tenant = tenant();
        let cancel = CancellationToken::new();
        let session = RemoteSession::new(&fetcher, &tenant, &cancel);
        let call = warden_core::Operation::Accounts.remote_call();
        let items = session.fetch_all_pages(call).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(fetcher.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_session_makes_no_call() {
        let fetcher = Pages {
            seen: Mutex::new(Vec::new()),
            pages_count: 1,
        };
        let tenant = tenant();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let session = RemoteSession::new(&fetcher, &tenant, &cancel);
        let err = session
            .call(warden_core::Operation::Licenses.remote_call(), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::Cancelled));
        assert!(fetcher.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn rpc_errors_keep_status_and_code() {
        let err = RpcError::Rpc {
            status: 200,
            error: warden_infra::RpcErrorObject {
                code: -32602,
                message: "Invalid params".into(),
                data: Some(json!({"details": "perPage must be <= 100"})),
            },
        };
        let remote = RemoteError::from(err);
        assert_eq!(remote.http_status, Some(200));
        assert_eq!(remote.code, Some(-32602));
        assert_eq!(remote.message, "Invalid params: perPage must be <= 100");
    }
}
