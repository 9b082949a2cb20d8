//! JSON-RPC 2.0 over HTTPS, one endpoint per remote service.
//!
//! Requests are `POST {base}/{service}` with HTTP basic auth (the API key as the
//! user name, empty password). Each API key gets its own rate-limit bucket.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use warden_core::RemoteCall;

#[derive(Debug, Clone, Serialize)]
struct RpcRequest<'a> {
    id: String,
    jsonrpc: &'static str,
    method: &'a str,
    params: &'a Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default, deserialize_with = "present")]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

// `"result": null` is a valid answer (deletes return it); only absence is `None`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// The `error` member of a JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl RpcErrorObject {
    /// The platform puts its human-readable explanation in `data.details`.
    pub fn details(&self) -> Option<&str> {
        self.data.as_ref()?.get("details")?.as_str()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("http {status}: {message}")]
    Http { status: u16, message: String },
    #[error("rpc error {} (http {status}): {}", .error.code, .error.message)]
    Rpc { status: u16, error: RpcErrorObject },
    #[error("malformed response (http {status}): {message}")]
    Decode { status: u16, message: String },
}

impl RpcError {
    pub fn http_status(&self) -> Option<u16> {
        match self {
            RpcError::Transport(e) => e.status().map(|s| s.as_u16()),
            RpcError::Http { status, .. }
            | RpcError::Rpc { status, .. }
            | RpcError::Decode { status, .. } => Some(*status),
        }
    }

    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            RpcError::Rpc { error, .. } => Some(error.code),
            _ => None,
        }
    }
}

pub struct JsonRpcClient {
    client: Client,
    base_url: String,
    limiter: Arc<DefaultKeyedRateLimiter<String>>,
}

impl JsonRpcClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(warden_config::REQUEST_TIMEOUT)
            .user_agent(concat!("warden/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let per_second =
            NonZeroU32::new(warden_config::REQUESTS_PER_SECOND).unwrap_or(nonzero!(1u32));
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            limiter: Arc::new(RateLimiter::keyed(Quota::per_second(per_second))),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, service: &str) -> String {
        format!("{}/{}", self.base_url, service.trim_matches('/'))
    }

    /// Performs one call and returns its `result` member.
    ///
    /// `rate_key` selects the rate-limit bucket; callers pass the tenant id.
    pub async fn call(
        &self,
        rate_key: &str,
        token: &str,
        call: RemoteCall,
        params: &Value,
    ) -> Result<Value, RpcError> {
        self.limiter.until_key_ready(&rate_key.to_string()).await;

        let request = RpcRequest {
            id: uuid::Uuid::new_v4().to_string(),
            jsonrpc: "2.0",
            method: call.method,
            params,
        };
        let url = self.endpoint(call.service);
        debug!(%url, method = call.method, id = %request.id, "rpc call");

        let resp = self
            .client
            .post(&url)
            .basic_auth(token, Some(""))
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.bytes().await?;
        Self::decode_response(status, &body)
    }

    fn decode_response(status: StatusCode, body: &[u8]) -> Result<Value, RpcError> {
        let code = status.as_u16();
        let parsed: Result<RpcResponse, _> = serde_json::from_slice(body);

        match parsed {
            Ok(RpcResponse {
                error: Some(error), ..
            }) => Err(RpcError::Rpc {
                status: code,
                error,
            }),
            Ok(RpcResponse {
                result: Some(result),
                ..
            }) if status.is_success() => Ok(result),
            Ok(_) if status.is_success() => Err(RpcError::Decode {
                status: code,
                message: "response carries neither result nor error".into(),
            }),
            Ok(_) => Err(RpcError::Http {
                status: code,
                message: status.canonical_reason().unwrap_or("request failed").into(),
            }),
            Err(e) if status.is_success() => Err(RpcError::Decode {
                status: code,
                message: e.to_string(),
            }),
            Err(_) => Err(RpcError::Http {
                status: code,
                message: String::from_utf8_lossy(body).chars().take(200).collect(),
            }),
        }
    }
}
