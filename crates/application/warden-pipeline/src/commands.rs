//! Remote deletes. These are the only paths that remove local rows outright.

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::info;
use warden_core::{CustomGroupRecord, Entity, PackageRecord, RemoteCall};

use crate::reconcile::run_blocking;
use crate::sync::remote::RemoteSession;
use crate::sync::{SyncEngine, SyncError};

pub const DELETE_CUSTOM_GROUP: RemoteCall = RemoteCall {
    service: "network",
    method: "deleteCustomGroup",
};

pub const DELETE_PACKAGE: RemoteCall = RemoteCall {
    service: "packages",
    method: "deletePackage",
};

impl SyncEngine {
    /// Deletes a custom group remotely, then drops its local row.
    /// Returns whether a local row existed.
    pub async fn delete_custom_group(
        &self,
        tenant_id: &str,
        group_id: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, SyncError> {
        self.delete_remote::<CustomGroupRecord>(
            tenant_id,
            group_id,
            DELETE_CUSTOM_GROUP,
            json!({ "groupId": group_id }),
            cancel,
        )
        .await
    }

    /// Deletes an installation package remotely, then drops its local row.
    pub async fn delete_package(
        &self,
        tenant_id: &str,
        package_id: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, SyncError> {
        self.delete_remote::<PackageRecord>(
            tenant_id,
            package_id,
            DELETE_PACKAGE,
            json!({ "packageId": package_id }),
            cancel,
        )
        .await
    }

    async fn delete_remote<E: Entity>(
        &self,
        tenant_id: &str,
        remote_id: &str,
        call: RemoteCall,
        params: serde_json::Value,
        cancel: &CancellationToken,
    ) -> Result<bool, SyncError> {
        let tenant = self.resolve_active(tenant_id)?;
        let _guard = self.locks().acquire(&tenant.id).await;

        let session = RemoteSession::new(self.fetcher(), &tenant, cancel);
        session.call(call, params).await?;

        let store = self.store().clone();
        let tenant_key = tenant.id.clone();
        let id = remote_id.to_string();
        let removed = run_blocking(move || store.remove::<E>(&tenant_key, &id)).await?;
        info!(
            tenant = %tenant.id,
            table = E::TABLE,
            id = remote_id,
            removed,
            "remote delete applied"
        );
        Ok(removed)
    }
}
