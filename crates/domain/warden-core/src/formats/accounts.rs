use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    pub full_name: Option<String>,
    pub timezone: Option<String>,
    pub language: Option<String>,
}

/// Item of `accounts/getAccountsList`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountItem {
    #[serde(default, deserialize_with = "super::lenient_id")]
    pub id: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub profile: Option<AccountProfile>,
    #[serde(default, deserialize_with = "super::null_default")]
    pub role: i64,
    pub rights: Option<Value>,
    pub status: Option<Value>,
}

/// Result of `companies/getCompanyDetails`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyDetails {
    #[serde(default, deserialize_with = "super::lenient_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "super::null_default")]
    pub company_type: i64,
    pub address: Option<String>,
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "super::null_default")]
    pub can_be_managed_by_above: bool,
    #[serde(default, deserialize_with = "super::null_default")]
    pub is_suspended: bool,
}
