pub mod commands;
pub mod reconcile;
pub mod sync;

// Re-export core engine components
pub use sync::remote::{
    CredentialError, CredentialGate, RemoteError, RemoteFetcher, RemoteSession, RpcRemoteFetcher,
};
pub use sync::{
    FailurePolicy, OperationCounts, OperationError, OperationOutcome, OperationReport,
    OperationStatus, SyncEngine, SyncError, SyncOptions, SyncReport, SyncStatus,
};
