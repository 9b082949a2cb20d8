//! Local row types, one per entity category.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::operation::Operation;
use crate::status::{
    AccountStatus, CompanyStatus, EndpointStatus, QuarantineActionStatus, ScanTaskStatus,
};
use crate::TenantId;

/// A JSON-valued column. Holds the encoded text; decoded only on read.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonBlob(String);

impl JsonBlob {
    pub fn encode(value: &Value) -> Self {
        Self(value.to_string())
    }

    pub fn null() -> Self {
        Self::encode(&Value::Null)
    }

    pub fn decode(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == "null"
    }
}

impl Default for JsonBlob {
    fn default() -> Self {
        Self::null()
    }
}

impl std::fmt::Debug for JsonBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JsonBlob({})", self.0)
    }
}

impl From<Option<Value>> for JsonBlob {
    fn from(value: Option<Value>) -> Self {
        value.as_ref().map(Self::encode).unwrap_or_default()
    }
}

/// Columns every row carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub tenant_id: TenantId,
    pub remote_id: String,
    pub first_seen_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecordMeta {
    pub fn new(tenant_id: &str, remote_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            remote_id: remote_id.into(),
            first_seen_at: now,
            updated_at: now,
        }
    }
}

/// A row stored in one entity table, keyed by `(tenant_id, remote_id)`.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: &'static str;
    const OPERATION: Operation;

    fn meta(&self) -> &RecordMeta;
    fn meta_mut(&mut self) -> &mut RecordMeta;

    fn tenant_id(&self) -> &str {
        &self.meta().tenant_id
    }

    fn remote_id(&self) -> &str {
        &self.meta().remote_id
    }

    /// Always false for categories without tombstoning.
    fn is_deleted(&self) -> bool {
        false
    }

    fn set_deleted(&mut self, _deleted: bool) {}

    /// Keep what an in-place update must not overwrite.
    fn carry_forward(&mut self, previous: &Self) {
        self.meta_mut().first_seen_at = previous.meta().first_seen_at;
    }
}

macro_rules! entity {
    ($ty:ty, $table:literal, $op:expr) => {
        impl Entity for $ty {
            const TABLE: &'static str = $table;
            const OPERATION: Operation = $op;

            fn meta(&self) -> &RecordMeta {
                &self.meta
            }

            fn meta_mut(&mut self) -> &mut RecordMeta {
                &mut self.meta
            }
        }
    };
    ($ty:ty, $table:literal, $op:expr, tombstone) => {
        impl Entity for $ty {
            const TABLE: &'static str = $table;
            const OPERATION: Operation = $op;

            fn meta(&self) -> &RecordMeta {
                &self.meta
            }

            fn meta_mut(&mut self) -> &mut RecordMeta {
                &mut self.meta
            }

            fn is_deleted(&self) -> bool {
                self.deleted
            }

            fn set_deleted(&mut self, deleted: bool) {
                self.deleted = deleted;
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub meta: RecordMeta,
    pub name: String,
    pub fqdn: Option<String>,
    pub group_id: Option<String>,
    pub is_managed: bool,
    pub machine_type: i64,
    pub operating_system: Option<String>,
    pub ip: Option<String>,
    pub macs: JsonBlob,
    pub ssid: Option<String>,
    pub policy_id: Option<String>,
    pub policy_name: Option<String>,
    pub policy_applied: bool,
    pub status: EndpointStatus,
    /// Module name -> enabled.
    pub modules: JsonBlob,
    pub deleted: bool,
}

entity!(EndpointRecord, "endpoints", Operation::Endpoints, tombstone);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub meta: RecordMeta,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: i64,
    pub rights: JsonBlob,
    pub timezone: Option<String>,
    pub status: AccountStatus,
}

entity!(AccountRecord, "accounts", Operation::Accounts);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub meta: RecordMeta,
    pub name: String,
    pub company_type: i64,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub can_be_managed_by_above: bool,
    pub status: CompanyStatus,
    pub details: JsonBlob,
}

entity!(CompanyRecord, "companies", Operation::Companies);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub meta: RecordMeta,
    pub name: String,
    pub created_by: Option<String>,
    pub last_modified: Option<String>,
    pub settings: JsonBlob,
}

entity!(PolicyRecord, "policies", Operation::Policies);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseRecord {
    /// `remote_id` is the license key.
    pub meta: RecordMeta,
    pub expiry_date: Option<String>,
    pub subscription_type: i64,
    pub used_slots: Option<i64>,
    pub total_slots: Option<i64>,
    pub usage: JsonBlob,
}

entity!(LicenseRecord, "licenses", Operation::Licenses);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub meta: RecordMeta,
    pub name: String,
    pub package_type: i64,
    pub description: Option<String>,
    pub modules: JsonBlob,
    pub languages: JsonBlob,
}

entity!(PackageRecord, "packages", Operation::Packages);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallationLinkRecord {
    /// `remote_id` is the package name, prefixed by the company id when present.
    pub meta: RecordMeta,
    pub package_name: String,
    pub company_id: Option<String>,
    pub company_name: Option<String>,
    pub links: JsonBlob,
}

entity!(
    InstallationLinkRecord,
    "installation_links",
    Operation::InstallationLinks
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantineItemRecord {
    pub meta: RecordMeta,
    pub endpoint_id: Option<String>,
    pub endpoint_name: Option<String>,
    pub threat_name: Option<String>,
    pub file_path: Option<String>,
    pub quarantined_on: Option<String>,
    pub action_status: QuarantineActionStatus,
    pub details: JsonBlob,
}

entity!(QuarantineItemRecord, "quarantine_items", Operation::Quarantine);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNodeRecord {
    pub meta: RecordMeta,
    pub name: String,
    pub parent_id: Option<String>,
    pub node_type: i64,
    pub details: JsonBlob,
    pub deleted: bool,
}

entity!(
    NetworkNodeRecord,
    "network_inventory",
    Operation::NetworkInventory,
    tombstone
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanTaskRecord {
    pub meta: RecordMeta,
    pub name: String,
    pub status: ScanTaskStatus,
    pub start_date: Option<String>,
}

entity!(ScanTaskRecord, "scan_tasks", Operation::ScanTasks);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomGroupRecord {
    pub meta: RecordMeta,
    pub name: String,
    pub parent_id: Option<String>,
}

entity!(CustomGroupRecord, "custom_groups", Operation::CustomGroups);
