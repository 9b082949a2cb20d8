use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointPolicyRef {
    #[serde(default, deserialize_with = "super::lenient_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::null_default")]
    pub applied: bool,
}

/// Item of `network/getEndpointsList`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointItem {
    #[serde(default, deserialize_with = "super::lenient_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub label: Option<String>,
    pub fqdn: Option<String>,
    #[serde(default, deserialize_with = "super::lenient_id")]
    pub group_id: Option<String>,
    #[serde(default, deserialize_with = "super::null_default")]
    pub is_managed: bool,
    #[serde(default, deserialize_with = "super::null_default")]
    pub machine_type: i64,
    pub operating_system_version: Option<String>,
    pub ip: Option<String>,
    pub macs: Option<Value>,
    pub ssid: Option<String>,
    pub policy: Option<EndpointPolicyRef>,
    /// String or integer state.
    pub state: Option<Value>,
    pub modules: Option<Value>,
}

/// Item of `network/getNetworkInventoryItems`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInventoryItem {
    #[serde(default, deserialize_with = "super::lenient_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::lenient_id")]
    pub parent_id: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "super::null_default")]
    pub node_type: i64,
    pub details: Option<Value>,
}

/// Item of `network/getCustomGroupsList`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomGroupItem {
    #[serde(default, deserialize_with = "super::lenient_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::lenient_id")]
    pub parent_id: Option<String>,
}

/// Item of `network/getScanTasksList`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanTaskItem {
    #[serde(default, deserialize_with = "super::lenient_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub status: Option<Value>,
    pub start_date: Option<String>,
}
