use serde_json::Value;
use warden_core::formats::{InstallationLinkItem, PackageItem};
use warden_core::{InstallationLinkRecord, JsonBlob, PackageRecord, RecordMeta};

use super::{fetch_and_merge, require, ItemError, ReconcileContext};
use crate::sync::{OperationCounts, OperationError};

pub(super) async fn sync_packages(
    ctx: &ReconcileContext<'_>,
) -> Result<OperationCounts, OperationError> {
    fetch_and_merge(ctx, |item: PackageItem| {
        Ok(PackageRecord {
            meta: RecordMeta::new(ctx.tenant_id, require(item.id, "id")?, ctx.now),
            name: item.name.unwrap_or_default(),
            package_type: item.package_type,
            description: item.description,
            modules: item.modules.into(),
            languages: item.languages.into(),
        })
    })
    .await
}

/// Row id of an installation link: `company/package`, or just the package name.
fn installation_link_id(company_id: Option<&str>, package_name: &str) -> String {
    match company_id {
        Some(company) => format!("{company}/{package_name}"),
        None => package_name.to_string(),
    }
}

fn link_record(
    ctx: &ReconcileContext<'_>,
    item: InstallationLinkItem,
) -> Result<InstallationLinkRecord, ItemError> {
    let package_name = require(
        item.package_name.clone().filter(|n| !n.trim().is_empty()),
        "packageName",
    )?;
    let company_id = item
        .company_id
        .clone()
        .map(|id| require(Some(id), "companyId"))
        .transpose()?;

    // Everything but the identifying fields goes into the links column.
    let mut links = serde_json::to_value(&item)?;
    if let Value::Object(obj) = &mut links {
        obj.remove("packageName");
        obj.remove("companyId");
        obj.remove("companyName");
        obj.retain(|_, v| !v.is_null());
    }

    Ok(InstallationLinkRecord {
        meta: RecordMeta::new(
            ctx.tenant_id,
            installation_link_id(company_id.as_deref(), &package_name),
            ctx.now,
        ),
        package_name,
        company_id,
        company_name: item.company_name,
        links: JsonBlob::encode(&links),
    })
}

pub(super) async fn sync_installation_links(
    ctx: &ReconcileContext<'_>,
) -> Result<OperationCounts, OperationError> {
    fetch_and_merge(ctx, |item: InstallationLinkItem| link_record(ctx, item)).await
}
