use warden_core::formats::QuarantineItem;
use warden_core::{QuarantineActionStatus, QuarantineItemRecord, RecordMeta};

use super::{fetch_and_merge, require, ReconcileContext};
use crate::sync::{OperationCounts, OperationError};

pub(super) async fn sync_quarantine(
    ctx: &ReconcileContext<'_>,
) -> Result<OperationCounts, OperationError> {
    fetch_and_merge(ctx, |item: QuarantineItem| {
        let file_path = item.file_path();
        Ok(QuarantineItemRecord {
            meta: RecordMeta::new(ctx.tenant_id, require(item.id, "id")?, ctx.now),
            endpoint_id: item.endpoint_id,
            endpoint_name: item.endpoint_name,
            threat_name: item.threat_name,
            file_path,
            quarantined_on: item.quarantined_on,
            action_status: QuarantineActionStatus::from_optional(item.action_status.as_ref()),
            details: item.details.into(),
        })
    })
    .await
}
