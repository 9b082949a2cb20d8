use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};
use warden_core::{Clock, Operation, Tenant};
use warden_persistence::{CheckpointStore, RedbStore};

use crate::reconcile::{self, run_blocking, ReconcileContext};
use crate::sync::locks::TenantLocks;
use crate::sync::remote::{CredentialError, CredentialGate, RemoteFetcher, RemoteSession};
use crate::sync::{
    FailurePolicy, OperationError, OperationOutcome, OperationStatus, SyncError, SyncOptions,
    SyncReport, SyncStatus,
};

/// The sync orchestrator. All collaborators are injected; one engine serves
/// every tenant.
pub struct SyncEngine {
    credentials: Arc<dyn CredentialGate>,
    fetcher: Arc<dyn RemoteFetcher>,
    store: RedbStore,
    checkpoints: Arc<dyn CheckpointStore>,
    clock: Arc<dyn Clock>,
    locks: TenantLocks,
}

impl SyncEngine {
    /// Checkpoints live in the same store as the entity tables.
    pub fn new(
        credentials: Arc<dyn CredentialGate>,
        fetcher: Arc<dyn RemoteFetcher>,
        store: RedbStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let checkpoints: Arc<dyn CheckpointStore> = Arc::new(store.clone());
        Self::with_components(credentials, fetcher, store, checkpoints, clock)
    }

    pub fn with_components(
        credentials: Arc<dyn CredentialGate>,
        fetcher: Arc<dyn RemoteFetcher>,
        store: RedbStore,
        checkpoints: Arc<dyn CheckpointStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            credentials,
            fetcher,
            store,
            checkpoints,
            clock,
            locks: TenantLocks::default(),
        }
    }

    pub fn store(&self) -> &RedbStore {
        &self.store
    }

    pub(crate) fn fetcher(&self) -> &dyn RemoteFetcher {
        self.fetcher.as_ref()
    }

    pub(crate) fn locks(&self) -> &TenantLocks {
        &self.locks
    }

    pub(crate) fn resolve(&self, tenant_id: &str) -> Result<Tenant, SyncError> {
        self.credentials.resolve(tenant_id).map_err(|e| match e {
            CredentialError::NotFound(id) => SyncError::TenantNotFound(id),
            CredentialError::Unavailable(msg) => SyncError::Credentials(msg),
        })
    }

    pub(crate) fn resolve_active(&self, tenant_id: &str) -> Result<Tenant, SyncError> {
        let tenant = self.resolve(tenant_id)?;
        if !tenant.active {
            return Err(SyncError::TenantInactive(tenant.id));
        }
        Ok(tenant)
    }

    /// Runs one pass for the tenant: every due operation of its category, in
    /// declared order.
    ///
    /// Fails fast when the tenant is unknown or inactive. Passes for the same
    /// tenant are serialized. The global checkpoint is written only when no
    /// operation failed.
    pub async fn sync_all(
        &self,
        tenant_id: &str,
        options: &SyncOptions,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let span = tracing::info_span!("sync_all", tenant = tenant_id);
        async move {
            let tenant = self.resolve_active(tenant_id)?;
            let _guard = self.locks.acquire(&tenant.id).await;
            self.run_pass(&tenant, options, cancel).await
        }
        .instrument(span)
        .await
    }

    async fn run_pass(
        &self,
        tenant: &Tenant,
        options: &SyncOptions,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let operations = tenant.category.operations();
        let mut report = SyncReport::new(&tenant.id, self.clock.now());
        let mut first_failure: Option<(Operation, OperationError)> = None;
        let session = RemoteSession::new(self.fetcher.as_ref(), tenant, cancel);

        for (idx, &op) in operations.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(operation = %op, "pass cancelled");
                report.finished_at = self.clock.now();
                return Err(SyncError::Cancelled {
                    report: Box::new(report),
                });
            }

            let now = self.clock.now();
            let last = match self.read_checkpoint(&tenant.id, op).await {
                Ok(last) => last,
                Err(e) => {
                    warn!(operation = %op, error = %e, "checkpoint unreadable");
                    report.push(op, OperationOutcome::Failed { message: e.to_string() });
                    if Self::on_failure(op, e, &mut first_failure, options) {
                        Self::mark_not_run(&mut report, &operations[idx + 1..]);
                        break;
                    }
                    continue;
                }
            };

            if !options.force && !op.is_due(last, now) {
                if let Some(last) = last {
                    let next_due = op.next_due(last);
                    debug!(operation = %op, %next_due, "fresh, skipping");
                    report.push(op, OperationOutcome::Fresh { next_due });
                }
                continue;
            }

            let ctx = ReconcileContext {
                remote: session,
                store: &self.store,
                tenant_id: &tenant.id,
                now,
            };
            match reconcile::run(op, &ctx).await {
                Ok(counts) => {
                    info!(
                        operation = %op,
                        fetched = counts.fetched,
                        inserted = counts.inserted,
                        updated = counts.updated,
                        unchanged = counts.unchanged,
                        tombstoned = counts.tombstoned,
                        skipped = counts.skipped,
                        "operation synced"
                    );
                    self.write_operation_checkpoint(&tenant.id, op).await;
                    report.push(op, OperationOutcome::Synced { counts });
                }
                Err(OperationError::Cancelled) => {
                    info!(operation = %op, "pass cancelled");
                    report.finished_at = self.clock.now();
                    return Err(SyncError::Cancelled {
                        report: Box::new(report),
                    });
                }
                Err(e) => {
                    error!(operation = %op, error = %e, "operation failed");
                    report.push(op, OperationOutcome::Failed { message: e.to_string() });
                    if Self::on_failure(op, e, &mut first_failure, options) {
                        Self::mark_not_run(&mut report, &operations[idx + 1..]);
                        break;
                    }
                }
            }
        }

        report.finished_at = self.clock.now();

        match first_failure {
            Some((operation, source)) => Err(SyncError::OperationFailed {
                operation,
                source,
                report: Box::new(report),
            }),
            None => {
                let checkpoints = self.checkpoints.clone();
                let tenant_id = tenant.id.clone();
                let at = report.finished_at;
                if let Err(e) =
                    run_blocking(move || checkpoints.set_global_checkpoint(&tenant_id, at)).await
                {
                    warn!(error = %e, "failed to write global checkpoint");
                }
                info!(ran = report.executed().len(), "pass complete");
                Ok(report)
            }
        }
    }

    /// Records a failure; returns whether the pass stops here.
    fn on_failure(
        op: Operation,
        err: OperationError,
        first_failure: &mut Option<(Operation, OperationError)>,
        options: &SyncOptions,
    ) -> bool {
        if first_failure.is_none() {
            *first_failure = Some((op, err));
        }
        options.failure_policy == FailurePolicy::AbortPass
    }

    fn mark_not_run(report: &mut SyncReport, remaining: &[Operation]) {
        for &op in remaining {
            report.push(op, OperationOutcome::NotRun);
        }
    }

    async fn read_checkpoint(
        &self,
        tenant_id: &str,
        op: Operation,
    ) -> Result<Option<chrono::DateTime<chrono::Utc>>, OperationError> {
        let checkpoints = self.checkpoints.clone();
        let tenant_id = tenant_id.to_string();
        run_blocking(move || checkpoints.operation_checkpoint(&tenant_id, op)).await
    }

    /// A failed write only means the operation runs again next pass.
    async fn write_operation_checkpoint(&self, tenant_id: &str, op: Operation) {
        let checkpoints = self.checkpoints.clone();
        let tenant = tenant_id.to_string();
        let at = self.clock.now();
        if let Err(e) =
            run_blocking(move || checkpoints.set_operation_checkpoint(&tenant, op, at)).await
        {
            warn!(operation = %op, error = %e, "failed to write operation checkpoint");
        }
    }

    /// Checkpoints of the tenant's operations and when each falls due.
    pub async fn status(&self, tenant_id: &str) -> Result<SyncStatus, SyncError> {
        let tenant = self.resolve(tenant_id)?;
        let now = self.clock.now();

        let checkpoints = self.checkpoints.clone();
        let id = tenant.id.clone();
        let (last_full_sync, stored) = run_blocking(move || {
            Ok((
                checkpoints.global_checkpoint(&id)?,
                checkpoints.operation_checkpoints(&id)?,
            ))
        })
        .await?;

        let operations = tenant
            .category
            .operations()
            .iter()
            .map(|&op| {
                let last_sync = stored
                    .iter()
                    .find(|c| c.operation == op)
                    .map(|c| c.last_sync);
                OperationStatus {
                    operation: op,
                    last_sync,
                    next_due: last_sync.map(|at| op.next_due(at)),
                    due: op.is_due(last_sync, now),
                }
            })
            .collect();

        Ok(SyncStatus {
            tenant_id: tenant.id,
            last_full_sync,
            operations,
        })
    }

    /// Forgets every checkpoint of the tenant, so the next pass runs everything.
    pub async fn clear_history(&self, tenant_id: &str) -> Result<(), SyncError> {
        let tenant = self.resolve(tenant_id)?;
        let _guard = self.locks.acquire(&tenant.id).await;
        let checkpoints = self.checkpoints.clone();
        let id = tenant.id.clone();
        run_blocking(move || checkpoints.clear_history(&id)).await?;
        info!(tenant = %tenant.id, "sync history cleared");
        Ok(())
    }
}
