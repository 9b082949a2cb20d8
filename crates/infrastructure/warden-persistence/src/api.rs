use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::Operation;

pub const CURRENT_SCHEMA: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbState {
    Missing,
    Valid,
    Busy,
    Corrupt,
    NewerSchema { found: u32, supported: u32 },
}

/// Outcome of one reconciliation transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Rows newly marked deleted because the listing no longer contains them.
    pub tombstoned: usize,
}

impl MergeStats {
    /// Rows present in the applied listing.
    pub fn synced(&self) -> usize {
        self.inserted + self.updated + self.unchanged
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationCheckpoint {
    pub operation: Operation,
    pub last_sync: DateTime<Utc>,
}

/// Durable "last successful sync" bookkeeping.
///
/// Failures come back as `Err` and never panic; callers decide whether a failed
/// write matters.
pub trait CheckpointStore: Send + Sync {
    fn global_checkpoint(&self, tenant_id: &str)
        -> Result<Option<DateTime<Utc>>, crate::StorageError>;

    fn set_global_checkpoint(
        &self,
        tenant_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), crate::StorageError>;

    fn operation_checkpoint(
        &self,
        tenant_id: &str,
        operation: Operation,
    ) -> Result<Option<DateTime<Utc>>, crate::StorageError>;

    fn set_operation_checkpoint(
        &self,
        tenant_id: &str,
        operation: Operation,
        at: DateTime<Utc>,
    ) -> Result<(), crate::StorageError>;

    fn operation_checkpoints(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<OperationCheckpoint>, crate::StorageError>;

    /// Removes the global and every operation checkpoint of the tenant in one
    /// transaction.
    fn clear_history(&self, tenant_id: &str) -> Result<(), crate::StorageError>;
}
