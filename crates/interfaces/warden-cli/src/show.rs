//! Read-only dump of one entity table.

use anyhow::{Context, Result};
use serde_json::Value;
use warden_core::{
    AccountRecord, CompanyRecord, CustomGroupRecord, EndpointRecord, Entity,
    InstallationLinkRecord, LicenseRecord, NetworkNodeRecord, Operation, PackageRecord,
    PolicyRecord, QuarantineItemRecord, ScanTaskRecord,
};
use warden_persistence::RedbStore;

/// Rows of `category` for the tenant, with JSON columns decoded in place.
pub async fn cmd_show(
    store: &RedbStore,
    tenant_id: &str,
    category: Operation,
    include_deleted: bool,
    print: bool,
) -> Result<Vec<Value>> {
    let store = store.clone();
    let tenant = tenant_id.to_string();
    let rows = tokio::task::spawn_blocking(move || {
        load_rows(&store, &tenant, category, include_deleted)
    })
    .await??;

    if print {
        if rows.is_empty() {
            println!("No {} rows stored for '{}'.", category, tenant_id);
        } else {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(rows)
}

fn load_rows(
    store: &RedbStore,
    tenant: &str,
    category: Operation,
    include_deleted: bool,
) -> Result<Vec<Value>> {
    match category {
        Operation::Policies => rows::<PolicyRecord>(store, tenant, include_deleted, &["settings"]),
        Operation::Endpoints => {
            rows::<EndpointRecord>(store, tenant, include_deleted, &["macs", "modules"])
        }
        Operation::Accounts => rows::<AccountRecord>(store, tenant, include_deleted, &["rights"]),
        Operation::Companies => {
            rows::<CompanyRecord>(store, tenant, include_deleted, &["details"])
        }
        Operation::CustomGroups => rows::<CustomGroupRecord>(store, tenant, include_deleted, &[]),
        Operation::Packages => {
            rows::<PackageRecord>(store, tenant, include_deleted, &["modules", "languages"])
        }
        Operation::InstallationLinks => {
            rows::<InstallationLinkRecord>(store, tenant, include_deleted, &["links"])
        }
        Operation::Quarantine => {
            rows::<QuarantineItemRecord>(store, tenant, include_deleted, &["details"])
        }
        Operation::NetworkInventory => {
            rows::<NetworkNodeRecord>(store, tenant, include_deleted, &["details"])
        }
        Operation::ScanTasks => rows::<ScanTaskRecord>(store, tenant, include_deleted, &[]),
        Operation::Licenses => rows::<LicenseRecord>(store, tenant, include_deleted, &["usage"]),
    }
}

fn rows<E: Entity>(
    store: &RedbStore,
    tenant: &str,
    include_deleted: bool,
    json_columns: &[&str],
) -> Result<Vec<Value>> {
    let records: Vec<E> = store
        .list(tenant, include_deleted)
        .with_context(|| format!("Failed to read table {}", E::TABLE))?;

    records
        .iter()
        .map(|r| -> Result<Value> {
            let mut row = serde_json::to_value(r)?;
            decode_columns(&mut row, json_columns).with_context(|| {
                format!("Corrupt JSON column in {} row {}", E::TABLE, r.remote_id())
            })?;
            Ok(row)
        })
        .collect()
}

fn decode_columns(row: &mut Value, columns: &[&str]) -> Result<()> {
    let Some(obj) = row.as_object_mut() else {
        return Ok(());
    };
    for &col in columns {
        if let Some(Value::String(text)) = obj.get(col) {
            let decoded: Value = serde_json::from_str(text)?;
            obj.insert(col.to_string(), decoded);
        }
    }
    Ok(())
}
