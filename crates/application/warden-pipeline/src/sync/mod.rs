use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::Operation;
use warden_persistence::{MergeStats, StorageError};

pub mod engine;
pub mod locks;
pub mod remote;

pub use engine::SyncEngine;
pub use remote::RemoteError;

/// What a pass does after an operation fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failed operation.
    #[default]
    AbortPass,
    /// Run the remaining operations anyway; the pass still reports the first failure.
    ContinuePass,
}

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Run every operation regardless of its checkpoint.
    pub force: bool,
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationCounts {
    /// Items returned by the remote side.
    pub fetched: usize,
    /// Items dropped because they could not be decoded or lacked an id.
    pub skipped: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub tombstoned: usize,
}

impl OperationCounts {
    pub fn from_merge(fetched: usize, skipped: usize, merge: MergeStats) -> Self {
        Self {
            fetched,
            skipped,
            inserted: merge.inserted,
            updated: merge.updated,
            unchanged: merge.unchanged,
            tombstoned: merge.tombstoned,
        }
    }

    /// Rows of the latest listing now present locally.
    pub fn synced(&self) -> usize {
        self.inserted + self.updated + self.unchanged
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OperationOutcome {
    Synced { counts: OperationCounts },
    /// Checkpoint younger than the staleness interval; nothing was fetched.
    Fresh { next_due: DateTime<Utc> },
    Failed { message: String },
    /// Left out because an earlier operation aborted the pass.
    NotRun,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationReport {
    pub operation: Operation,
    #[serde(flatten)]
    pub outcome: OperationOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub tenant_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub operations: Vec<OperationReport>,
}

impl SyncReport {
    pub(crate) fn new(tenant_id: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            started_at,
            finished_at: started_at,
            operations: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, operation: Operation, outcome: OperationOutcome) {
        self.operations.push(OperationReport { operation, outcome });
    }

    /// Operations that actually reached the remote side, in pass order.
    pub fn executed(&self) -> Vec<Operation> {
        self.operations
            .iter()
            .filter(|r| {
                matches!(
                    r.outcome,
                    OperationOutcome::Synced { .. } | OperationOutcome::Failed { .. }
                )
            })
            .map(|r| r.operation)
            .collect()
    }

    /// Synced row counts keyed by operation name; only operations that ran.
    pub fn counts_per_category(&self) -> BTreeMap<String, usize> {
        self.operations
            .iter()
            .filter_map(|r| match &r.outcome {
                OperationOutcome::Synced { counts } => {
                    Some((r.operation.name().to_string(), counts.synced()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn counts(&self, operation: Operation) -> Option<OperationCounts> {
        self.operations.iter().find_map(|r| match &r.outcome {
            OperationOutcome::Synced { counts } if r.operation == operation => Some(*counts),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStatus {
    pub operation: Operation,
    pub last_sync: Option<DateTime<Utc>>,
    pub next_due: Option<DateTime<Utc>>,
    pub due: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub tenant_id: String,
    pub last_full_sync: Option<DateTime<Utc>>,
    pub operations: Vec<OperationStatus>,
}

/// Failure of a single operation.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("remote call failed: {0}")]
    Remote(#[from] RemoteError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("unexpected payload: {0}")]
    Payload(String),
    #[error("background task failed: {0}")]
    Join(String),
    #[error("cancelled")]
    Cancelled,
}

/// Top-level error of a pass or a tenant-scoped command.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("tenant {0} not found")]
    TenantNotFound(String),
    #[error("tenant {0} is inactive")]
    TenantInactive(String),
    #[error("tenant registry unavailable: {0}")]
    Credentials(String),
    #[error("{operation} failed: {source}")]
    OperationFailed {
        operation: Operation,
        #[source]
        source: OperationError,
        report: Box<SyncReport>,
    },
    #[error("sync cancelled")]
    Cancelled { report: Box<SyncReport> },
    #[error(transparent)]
    Request(#[from] OperationError),
}

impl SyncError {
    /// Stable machine-readable code used by the HTTP surface.
    pub fn code(&self) -> &'static str {
        match self {
            SyncError::TenantNotFound(_) => "TENANT_NOT_FOUND",
            SyncError::TenantInactive(_) => "TENANT_INACTIVE",
            SyncError::Credentials(_) => "CREDENTIALS_UNAVAILABLE",
            SyncError::OperationFailed { .. } => "SYNC_FAILED",
            SyncError::Cancelled { .. } => "SYNC_CANCELLED",
            SyncError::Request(OperationError::Remote(_)) => "REMOTE_ERROR",
            SyncError::Request(_) => "INTERNAL_ERROR",
        }
    }

    /// The partial report of a pass that did not complete.
    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            SyncError::OperationFailed { report, .. } | SyncError::Cancelled { report } => {
                Some(report)
            }
            _ => None,
        }
    }
}
