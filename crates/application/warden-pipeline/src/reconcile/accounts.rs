use serde_json::Value;
use warden_core::formats::{AccountItem, CompanyDetails};
use warden_core::{
    AccountRecord, AccountStatus, CompanyRecord, CompanyStatus, JsonBlob, Operation, RecordMeta,
};

use super::{decode_items, fetch_items, merge, require, ItemError, ReconcileContext};
use crate::sync::{OperationCounts, OperationError};

pub(super) async fn sync_accounts(
    ctx: &ReconcileContext<'_>,
) -> Result<OperationCounts, OperationError> {
    super::fetch_and_merge(ctx, |item: AccountItem| {
        let profile = item.profile.unwrap_or_default();
        Ok(AccountRecord {
            meta: RecordMeta::new(ctx.tenant_id, require(item.id, "id")?, ctx.now),
            email: item.email,
            full_name: item.full_name.or(profile.full_name),
            role: item.role,
            rights: item.rights.into(),
            timezone: profile.timezone,
            status: AccountStatus::from_optional(item.status.as_ref()),
        })
    })
    .await
}

/// The company result is a single object; the raw payload is kept as `details`.
pub(super) async fn sync_companies(
    ctx: &ReconcileContext<'_>,
) -> Result<OperationCounts, OperationError> {
    let items = fetch_items(ctx, Operation::Companies).await?;
    let fetched = items.len();
    let (rows, skipped) = decode_items(Operation::Companies, items, |raw: Value| {
        let details = JsonBlob::encode(&raw);
        let company: CompanyDetails = serde_json::from_value(raw)?;
        company_record(ctx, company, details)
    });
    merge(ctx, fetched, skipped, rows).await
}

fn company_record(
    ctx: &ReconcileContext<'_>,
    company: CompanyDetails,
    details: JsonBlob,
) -> Result<CompanyRecord, ItemError> {
    Ok(CompanyRecord {
        meta: RecordMeta::new(ctx.tenant_id, require(company.id, "id")?, ctx.now),
        name: company.name.unwrap_or_default(),
        company_type: company.company_type,
        address: company.address,
        phone: company.phone,
        can_be_managed_by_above: company.can_be_managed_by_above,
        status: if company.is_suspended {
            CompanyStatus::Suspended
        } else {
            CompanyStatus::Active
        },
        details,
    })
}
