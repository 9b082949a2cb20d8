//! Shapes of the remote API's JSON-RPC results.
//!
//! Every field the engine does not strictly need is optional; required fields
//! are checked when an item is mapped into a record, not here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod accounts;
pub mod licensing;
pub mod network;
pub mod packages;
pub mod policies;
pub mod quarantine;

pub use accounts::{AccountItem, CompanyDetails};
pub use licensing::LicenseInfo;
pub use network::{CustomGroupItem, EndpointItem, NetworkInventoryItem, ScanTaskItem};
pub use packages::{InstallationLinkItem, PackageItem};
pub use policies::{PolicyDetails, PolicyListItem};
pub use quarantine::QuarantineItem;

/// One page of a paged listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult {
    #[serde(default, deserialize_with = "null_default")]
    pub items: Vec<Value>,
    #[serde(default, deserialize_with = "null_default")]
    pub page: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub pages_count: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub per_page: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub total: u64,
}

impl PagedResult {
    pub fn has_more(&self) -> bool {
        self.page < self.pages_count
    }
}

/// `null` reads as the type's default, same as an absent field.
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Id of a raw listing item, read the way typed items read theirs.
pub fn raw_item_id(item: &Value) -> Option<String> {
    let id = item.get("id")?.clone();
    lenient_id(id).ok().flatten()
}

/// Accepts ids sent either as strings or numbers.
pub(crate) fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
