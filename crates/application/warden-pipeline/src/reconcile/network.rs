use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};
use warden_core::formats::{CustomGroupItem, EndpointItem, NetworkInventoryItem, ScanTaskItem};
use warden_core::modules::module_flags_from_settings;
use warden_core::{
    CustomGroupRecord, EndpointRecord, EndpointStatus, JsonBlob, NetworkNodeRecord, PolicyRecord,
    RecordMeta, ScanTaskStatus,
};

use super::{fetch_and_merge, require, run_blocking, ItemError, ReconcileContext};
use crate::sync::{OperationCounts, OperationError};

fn flags_blob(flags: &BTreeMap<String, bool>) -> JsonBlob {
    let obj: Map<String, Value> = flags
        .iter()
        .map(|(k, v)| (k.clone(), Value::Bool(*v)))
        .collect();
    JsonBlob::encode(&Value::Object(obj))
}

/// Module flags of every stored policy, keyed by policy id.
async fn policy_module_flags(
    ctx: &ReconcileContext<'_>,
) -> Result<HashMap<String, BTreeMap<String, bool>>, OperationError> {
    let store = ctx.store.clone();
    let tenant = ctx.tenant_id.to_string();
    let policies: Vec<PolicyRecord> = run_blocking(move || store.list(&tenant, false)).await?;

    Ok(policies
        .into_iter()
        .filter_map(|p| {
            let settings = p.settings.decode().ok()?;
            Some((p.meta.remote_id, module_flags_from_settings(&settings)))
        })
        .collect())
}

pub(super) fn endpoint_record(
    ctx: &ReconcileContext<'_>,
    item: EndpointItem,
    policy_flags: &HashMap<String, BTreeMap<String, bool>>,
) -> Result<EndpointRecord, ItemError> {
    let id = require(item.id, "id")?;
    let policy = item.policy.unwrap_or_default();

    let modules = match item.modules {
        Some(modules @ Value::Object(_)) => JsonBlob::encode(&modules),
        _ => policy
            .id
            .as_ref()
            .and_then(|pid| policy_flags.get(pid))
            .map(flags_blob)
            .unwrap_or_default(),
    };

    Ok(EndpointRecord {
        meta: RecordMeta::new(ctx.tenant_id, id, ctx.now),
        name: item.name.or(item.label).unwrap_or_default(),
        fqdn: item.fqdn,
        group_id: item.group_id,
        is_managed: item.is_managed,
        machine_type: item.machine_type,
        operating_system: item.operating_system_version,
        ip: item.ip,
        macs: item.macs.into(),
        ssid: item.ssid,
        policy_id: policy.id,
        policy_name: policy.name,
        policy_applied: policy.applied,
        status: EndpointStatus::from_optional(item.state.as_ref()),
        modules,
        deleted: false,
    })
}

pub(super) async fn sync_endpoints(
    ctx: &ReconcileContext<'_>,
) -> Result<OperationCounts, OperationError> {
    let policy_flags = policy_module_flags(ctx).await?;
    fetch_and_merge(ctx, |item: EndpointItem| {
        endpoint_record(ctx, item, &policy_flags)
    })
    .await
}

pub(super) async fn sync_network_inventory(
    ctx: &ReconcileContext<'_>,
) -> Result<OperationCounts, OperationError> {
    fetch_and_merge(ctx, |item: NetworkInventoryItem| {
        Ok(NetworkNodeRecord {
            meta: RecordMeta::new(ctx.tenant_id, require(item.id, "id")?, ctx.now),
            name: item.name.unwrap_or_default(),
            parent_id: item.parent_id,
            node_type: item.node_type,
            details: item.details.into(),
            deleted: false,
        })
    })
    .await
}

pub(super) async fn sync_custom_groups(
    ctx: &ReconcileContext<'_>,
) -> Result<OperationCounts, OperationError> {
    fetch_and_merge(ctx, |item: CustomGroupItem| {
        Ok(CustomGroupRecord {
            meta: RecordMeta::new(ctx.tenant_id, require(item.id, "id")?, ctx.now),
            name: item.name.unwrap_or_default(),
            parent_id: item.parent_id,
        })
    })
    .await
}

pub(super) async fn sync_scan_tasks(
    ctx: &ReconcileContext<'_>,
) -> Result<OperationCounts, OperationError> {
    fetch_and_merge(ctx, |item: ScanTaskItem| {
        Ok(warden_core::ScanTaskRecord {
            meta: RecordMeta::new(ctx.tenant_id, require(item.id, "id")?, ctx.now),
            name: item.name.unwrap_or_default(),
            status: ScanTaskStatus::from_optional(item.status.as_ref()),
            start_date: item.start_date,
        })
    })
    .await
}
