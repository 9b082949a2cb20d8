use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Item of `quarantine/computers/getQuarantineItemsList`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarantineItem {
    #[serde(default, deserialize_with = "super::lenient_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "super::lenient_id")]
    pub endpoint_id: Option<String>,
    pub endpoint_name: Option<String>,
    #[serde(rename = "endpointIP")]
    pub endpoint_ip: Option<String>,
    pub threat_name: Option<String>,
    pub quarantined_on: Option<String>,
    pub action_status: Option<Value>,
    pub details: Option<Value>,
}

impl QuarantineItem {
    pub fn file_path(&self) -> Option<String> {
        self.details
            .as_ref()
            .and_then(|d| d.get("filePath"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}
