use serde::{Deserialize, Serialize};

pub mod clock;
pub mod formats;
pub mod modules;
pub mod operation;
pub mod records;
pub mod status;

pub use clock::{Clock, ManualClock, SystemClock};
pub use operation::{MergePattern, Operation, PayloadShape, RemoteCall, UnknownOperation};
pub use records::*;
pub use status::*;

pub type TenantId = String;

/// Which operation set a tenant runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantCategory {
    /// License-only keys; everything else would be wasted remote load.
    ProductOnly,
    #[default]
    FullService,
}

impl TenantCategory {
    pub fn operations(self) -> &'static [Operation] {
        match self {
            TenantCategory::ProductOnly => Operation::PRODUCT_ONLY,
            TenantCategory::FullService => Operation::FULL_SERVICE,
        }
    }
}

/// A configured API key scope.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub token: String,
    pub active: bool,
    #[serde(default)]
    pub category: TenantCategory,
}

impl std::fmt::Debug for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tenant")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("token", &"<redacted>")
            .field("active", &self.active)
            .field("category", &self.category)
            .finish()
    }
}
