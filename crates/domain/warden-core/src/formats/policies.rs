use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Item of `policies/getPoliciesList`; carries no settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyListItem {
    #[serde(default, deserialize_with = "super::lenient_id")]
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Result of `policies/getPolicyDetails`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDetails {
    #[serde(default, deserialize_with = "super::lenient_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub created_by: Option<String>,
    pub last_modify_date: Option<String>,
    pub settings: Option<Value>,
}
