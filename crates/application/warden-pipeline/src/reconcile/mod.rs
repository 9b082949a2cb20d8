//! Maps remote payloads into local rows and merges them, one transaction per
//! operation.
//!
//! Items are decoded one by one: an item that does not decode or lacks a usable
//! id is logged and skipped, the rest of the listing still lands. A skipped item
//! whose id can still be read keeps its stored row out of tombstoning.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;
use warden_core::formats::raw_item_id;
use warden_core::{Entity, MergePattern, Operation, PayloadShape};
use warden_persistence::{RedbStore, RowKey, StorageError};

use crate::sync::remote::RemoteSession;
use crate::sync::{OperationCounts, OperationError};

mod accounts;
mod licensing;
mod network;
mod packages;
mod policies;
mod quarantine;

/// Why a single remote item was dropped.
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("item could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("item has no {0}")]
    MissingField(&'static str),
    #[error("{field} {value:?} cannot be stored as a key")]
    InvalidKey { field: &'static str, value: String },
}

/// Everything one operation needs.
pub struct ReconcileContext<'a> {
    pub remote: RemoteSession<'a>,
    pub store: &'a RedbStore,
    pub tenant_id: &'a str,
    /// Timestamp stamped on rows written by this operation.
    pub now: DateTime<Utc>,
}

/// Fetches and reconciles one operation.
pub async fn run(op: Operation, ctx: &ReconcileContext<'_>) -> Result<OperationCounts, OperationError> {
    match op {
        Operation::Policies => policies::sync_policies(ctx).await,
        Operation::Endpoints => network::sync_endpoints(ctx).await,
        Operation::Accounts => accounts::sync_accounts(ctx).await,
        Operation::Companies => accounts::sync_companies(ctx).await,
        Operation::CustomGroups => network::sync_custom_groups(ctx).await,
        Operation::Packages => packages::sync_packages(ctx).await,
        Operation::InstallationLinks => packages::sync_installation_links(ctx).await,
        Operation::Quarantine => quarantine::sync_quarantine(ctx).await,
        Operation::NetworkInventory => network::sync_network_inventory(ctx).await,
        Operation::ScanTasks => network::sync_scan_tasks(ctx).await,
        Operation::Licenses => licensing::sync_licenses(ctx).await,
    }
}

/// Fetches the raw items of `op` according to its payload shape.
pub(crate) async fn fetch_items(
    ctx: &ReconcileContext<'_>,
    op: Operation,
) -> Result<Vec<Value>, OperationError> {
    let call = op.remote_call();
    match op.payload_shape() {
        PayloadShape::Paged => ctx.remote.fetch_all_pages(call).await,
        PayloadShape::List => ctx.remote.fetch_list(call).await,
        PayloadShape::Single => ctx.remote.fetch_single(call).await,
    }
}

/// Decodes every item as `T` and maps it into a row; failures are counted, not raised.
pub(crate) fn decode_items<T, R>(
    op: Operation,
    items: Vec<Value>,
    mut map: impl FnMut(T) -> Result<R, ItemError>,
) -> (Vec<R>, usize)
where
    T: DeserializeOwned,
{
    let mut rows = Vec::with_capacity(items.len());
    let mut skipped = 0;
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<T>(item)
            .map_err(ItemError::from)
            .and_then(&mut map)
        {
            Ok(row) => rows.push(row),
            Err(error) => {
                skipped += 1;
                warn!(operation = %op, index, %error, "skipping remote item");
            }
        }
    }
    (rows, skipped)
}

/// A present value that can also serve as (part of) a row key.
pub(crate) fn require(value: Option<String>, field: &'static str) -> Result<String, ItemError> {
    let value = value.ok_or(ItemError::MissingField(field))?;
    match RowKey::validate_component(&value) {
        Ok(()) => Ok(value),
        Err(_) => Err(ItemError::InvalidKey { field, value }),
    }
}

/// Ids the remote listed, whether or not their item decodes.
pub(crate) fn listed_ids(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(raw_item_id)
        .filter(|id| RowKey::validate_component(id).is_ok())
        .collect()
}

/// Runs a blocking store call off the async runtime.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, OperationError>
where
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| OperationError::Join(e.to_string()))?
        .map_err(OperationError::Storage)
}

/// Merges the mapped rows of `E` with the pattern of its operation.
pub(crate) async fn merge<E: Entity>(
    ctx: &ReconcileContext<'_>,
    fetched: usize,
    skipped: usize,
    rows: Vec<E>,
) -> Result<OperationCounts, OperationError> {
    merge_listing(ctx, fetched, skipped, rows, Vec::new()).await
}

/// [`merge`] for a full listing; rows of `listed` ids are never tombstoned.
pub(crate) async fn merge_listing<E: Entity>(
    ctx: &ReconcileContext<'_>,
    fetched: usize,
    skipped: usize,
    rows: Vec<E>,
    listed: Vec<String>,
) -> Result<OperationCounts, OperationError> {
    let store = ctx.store.clone();
    let tenant = ctx.tenant_id.to_string();
    let pattern = E::OPERATION.merge_pattern();
    let stats =
        run_blocking(move || store.apply_listing(&tenant, rows, &listed, pattern)).await?;
    Ok(OperationCounts::from_merge(fetched, skipped, stats))
}

/// The common path: fetch, decode as `T`, map to `E`, merge.
pub(crate) async fn fetch_and_merge<T, E>(
    ctx: &ReconcileContext<'_>,
    map: impl FnMut(T) -> Result<E, ItemError>,
) -> Result<OperationCounts, OperationError>
where
    T: DeserializeOwned,
    E: Entity,
{
    let items = fetch_items(ctx, E::OPERATION).await?;
    let fetched = items.len();
    let listed = if skipped_rows_matter(E::OPERATION) {
        listed_ids(&items)
    } else {
        Vec::new()
    };
    let (rows, skipped) = decode_items(E::OPERATION, items, map);
    merge_listing(ctx, fetched, skipped, rows, listed).await
}

fn skipped_rows_matter(op: Operation) -> bool {
    op.merge_pattern() == MergePattern::Tombstone
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warden_core::formats::CustomGroupItem;

    #[test]
    fn bad_items_are_skipped_individually() {
        let items = vec![
            json!({"id": "g1", "name": "A"}),
            json!({"id": "g2", "name": 42}),
            json!({"name": "no id"}),
            json!({"id": 7, "name": "numeric id"}),
        ];
        let (rows, skipped) = decode_items(Operation::CustomGroups, items, |g: CustomGroupItem| {
            require(g.id, "id")
        });
        assert_eq!(rows, vec!["g1".to_string(), "7".to_string()]);
        assert_eq!(skipped, 2);
    }

    #[test]
    fn ids_that_cannot_be_keys_are_item_errors() {
        assert!(matches!(
            require(Some("a\0b".into()), "id"),
            Err(ItemError::InvalidKey { field: "id", .. })
        ));
        assert!(matches!(require(None, "id"), Err(ItemError::MissingField("id"))));
        assert_eq!(require(Some("a1".into()), "id").unwrap(), "a1");
    }

    #[test]
    fn listed_ids_include_undecodable_items() {
        let items = vec![
            json!({"id": "e1"}),
            json!({"id": "e2", "machineType": "bogus"}),
            json!({"id": "bad\0id"}),
            json!({"name": "no id"}),
        ];
        assert_eq!(listed_ids(&items), vec!["e1".to_string(), "e2".to_string()]);
    }
}
