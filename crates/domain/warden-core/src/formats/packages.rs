use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Item of `packages/getPackagesList`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageItem {
    #[serde(default, deserialize_with = "super::lenient_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "super::null_default")]
    pub package_type: i64,
    pub description: Option<String>,
    pub modules: Option<Value>,
    pub languages: Option<Value>,
}

/// Item of `packages/getInstallationLinks`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationLinkItem {
    pub package_name: Option<String>,
    #[serde(default, deserialize_with = "super::lenient_id")]
    pub company_id: Option<String>,
    pub company_name: Option<String>,
    pub install_link_windows: Option<String>,
    pub install_link_mac: Option<String>,
    pub install_link_linux: Option<String>,
    pub full_kit_windows_x64: Option<String>,
    pub full_kit_linux_x64: Option<String>,
    /// Anything else the remote side reports, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}
