use futures::{StreamExt, TryStreamExt};
use serde_json::{json, Value};
use tracing::debug;
use warden_core::formats::{PolicyDetails, PolicyListItem};
use warden_core::{Operation, PolicyRecord, RecordMeta, RemoteCall};

use super::{decode_items, fetch_items, merge, ReconcileContext};
use crate::sync::{OperationCounts, OperationError};

const GET_POLICY_DETAILS: RemoteCall = RemoteCall {
    service: "policies",
    method: "getPolicyDetails",
};

/// The listing carries no settings, so each policy is followed by a details call.
/// Any failed details call fails the operation.
pub(super) async fn sync_policies(
    ctx: &ReconcileContext<'_>,
) -> Result<OperationCounts, OperationError> {
    let items = fetch_items(ctx, Operation::Policies).await?;
    let fetched = items.len();
    let (listed, mut skipped) = decode_items(Operation::Policies, items, |p: PolicyListItem| {
        Ok((super::require(p.id, "id")?, p.name))
    });

    let details: Vec<(String, Option<String>, Value)> = futures::stream::iter(listed)
        .map(|(id, name)| async move {
            let value = ctx
                .remote
                .call(GET_POLICY_DETAILS, json!({ "policyId": id }))
                .await?;
            Ok::<_, OperationError>((id, name, value))
        })
        .buffer_unordered(warden_config::DETAIL_FETCH_CONCURRENCY)
        .try_collect()
        .await?;
    debug!(policies = details.len(), "policy details fetched");

    let mut rows = Vec::with_capacity(details.len());
    for (id, list_name, value) in details {
        let (mut decoded, extra_skips) =
            decode_items(Operation::Policies, vec![value], |d: PolicyDetails| Ok(d));
        skipped += extra_skips;
        let Some(d) = decoded.pop() else {
            continue;
        };
        rows.push(PolicyRecord {
            meta: RecordMeta::new(ctx.tenant_id, d.id.unwrap_or(id), ctx.now),
            name: d.name.or(list_name).unwrap_or_default(),
            created_by: d.created_by,
            last_modified: d.last_modify_date,
            settings: d.settings.into(),
        });
    }

    merge(ctx, fetched, skipped, rows).await
}
