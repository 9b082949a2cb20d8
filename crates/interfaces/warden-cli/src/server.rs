//! Inbound HTTP trigger.
//!
//! - `POST /sync/all` `{ "apiKeyId", "force"? }` runs one pass
//! - `GET /sync/status/{apiKeyId}` lists checkpoints and due times
//! - `POST /sync/clear-history` `{ "apiKeyId" }` forgets every checkpoint
//!
//! Failures answer `{ "error": { "code", "message" } }`.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use warden_pipeline::{OperationError, SyncEngine, SyncError, SyncOptions, SyncStatus};

#[derive(Clone)]
pub struct ServerState {
    engine: Arc<SyncEngine>,
    shutdown: CancellationToken,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAllRequest {
    pub api_key_id: String,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearHistoryRequest {
    pub api_key_id: String,
}

#[derive(Debug, Serialize)]
pub struct SyncAllResponse {
    pub success: bool,
    pub message: String,
    pub data: SyncAllData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAllData {
    pub counts_per_category: BTreeMap<String, usize>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub data: SyncStatus,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Error half of every handler.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "INVALID_REQUEST",
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR",
            message: message.into(),
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        let status = match &e {
            SyncError::TenantNotFound(_) => StatusCode::NOT_FOUND,
            SyncError::TenantInactive(_) => StatusCode::FORBIDDEN,
            SyncError::OperationFailed { .. } => StatusCode::BAD_GATEWAY,
            SyncError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
            SyncError::Request(OperationError::Remote(_)) => StatusCode::BAD_GATEWAY,
            SyncError::Credentials(_) | SyncError::Request(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            code: e.code(),
            message: e.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        });
        (self.status, Json(body)).into_response()
    }
}

pub fn router(engine: Arc<SyncEngine>, shutdown: CancellationToken) -> Router {
    Router::new()
        .route("/sync/all", post(sync_all_handler))
        .route("/sync/status/:api_key_id", get(status_handler))
        .route("/sync/clear-history", post(clear_history_handler))
        .with_state(ServerState { engine, shutdown })
}

/// Serves until `shutdown` fires. Passes in flight see the same token and stop
/// at their next operation boundary.
pub async fn serve(
    listener: TcpListener,
    engine: Arc<SyncEngine>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "sync trigger listening");

    let signal = shutdown.clone();
    axum::serve(listener, router(engine, shutdown))
        .with_graceful_shutdown(async move { signal.cancelled().await })
        .await
        .context("HTTP server failed")
}

fn require_id(id: &str) -> Result<(), ApiError> {
    if id.trim().is_empty() {
        return Err(ApiError::invalid("apiKeyId is required"));
    }
    Ok(())
}

async fn sync_all_handler(
    State(state): State<ServerState>,
    payload: Result<Json<SyncAllRequest>, JsonRejection>,
) -> Result<Json<SyncAllResponse>, ApiError> {
    let Json(req) = payload?;
    require_id(&req.api_key_id)?;

    let options = SyncOptions {
        force: req.force,
        ..SyncOptions::default()
    };
    let cancel = state.shutdown.child_token();
    let engine = state.engine.clone();
    let tenant_id = req.api_key_id.clone();

    // A dropped connection must not abandon a pass halfway through an operation.
    let pass = tokio::spawn(async move { engine.sync_all(&tenant_id, &options, &cancel).await });
    let report = pass
        .await
        .map_err(|e| {
            error!(error = %e, "sync task panicked");
            ApiError::internal(e.to_string())
        })??;

    let counts = report.counts_per_category();
    Ok(Json(SyncAllResponse {
        success: true,
        message: format!(
            "Sync completed for {} ({} operations ran)",
            report.tenant_id,
            report.executed().len()
        ),
        data: SyncAllData {
            counts_per_category: counts,
        },
    }))
}

async fn status_handler(
    State(state): State<ServerState>,
    Path(api_key_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    require_id(&api_key_id)?;
    let status = state.engine.status(&api_key_id).await?;
    Ok(Json(StatusResponse {
        success: true,
        data: status,
    }))
}

async fn clear_history_handler(
    State(state): State<ServerState>,
    payload: Result<Json<ClearHistoryRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(req) = payload?;
    require_id(&req.api_key_id)?;
    state.engine.clear_history(&req.api_key_id).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: format!("Sync history cleared for {}", req.api_key_id),
    }))
}
