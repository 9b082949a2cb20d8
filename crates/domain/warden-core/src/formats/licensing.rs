use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of `licensing/getLicenseInfo`. The key doubles as the row id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseInfo {
    pub license_key: Option<String>,
    pub expiry_date: Option<String>,
    #[serde(default, deserialize_with = "super::null_default")]
    pub subscription_type: i64,
    pub used_slots: Option<i64>,
    pub total_slots: Option<i64>,
    pub own_use: Option<Value>,
    pub reserved_slots: Option<i64>,
}
