use serde_json::json;
use warden_core::formats::LicenseInfo;
use warden_core::{JsonBlob, LicenseRecord, RecordMeta};

use super::{fetch_and_merge, require, ReconcileContext};
use crate::sync::{OperationCounts, OperationError};

/// One row per license key; slot usage is kept as a JSON column.
pub(super) async fn sync_licenses(
    ctx: &ReconcileContext<'_>,
) -> Result<OperationCounts, OperationError> {
    fetch_and_merge(ctx, |info: LicenseInfo| {
        let key = require(
            info.license_key.filter(|k| !k.trim().is_empty()),
            "licenseKey",
        )?;
        let usage = json!({
            "usedSlots": info.used_slots,
            "totalSlots": info.total_slots,
            "reservedSlots": info.reserved_slots,
            "ownUse": info.own_use,
        });
        Ok(LicenseRecord {
            meta: RecordMeta::new(ctx.tenant_id, key, ctx.now),
            expiry_date: info.expiry_date,
            subscription_type: info.subscription_type,
            used_slots: info.used_slots,
            total_slots: info.total_slots,
            usage: JsonBlob::encode(&usage),
        })
    })
    .await
}
