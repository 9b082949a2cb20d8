use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// One named synchronization unit. Variant order is the order a pass runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Policies,
    Endpoints,
    Accounts,
    Companies,
    CustomGroups,
    Packages,
    InstallationLinks,
    Quarantine,
    NetworkInventory,
    ScanTasks,
    Licenses,
}

/// Remote JSON-RPC endpoint: `service` is the URL path below the API base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteCall {
    pub service: &'static str,
    pub method: &'static str,
}

/// How the `result` of a listing call is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// `{ items, page, pagesCount, perPage, total }`, fetched page by page.
    Paged,
    /// A bare JSON array.
    List,
    /// A single object.
    Single,
}

/// How a fetched listing is merged into the local table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePattern {
    /// Keyed upsert; rows missing from the listing are left alone.
    Upsert,
    /// Full-listing sync; rows missing from the listing are tombstoned.
    Tombstone,
}

impl Operation {
    pub const ALL: [Operation; 11] = [
        Operation::Policies,
        Operation::Endpoints,
        Operation::Accounts,
        Operation::Companies,
        Operation::CustomGroups,
        Operation::Packages,
        Operation::InstallationLinks,
        Operation::Quarantine,
        Operation::NetworkInventory,
        Operation::ScanTasks,
        Operation::Licenses,
    ];

    pub const FULL_SERVICE: &'static [Operation] = &Operation::ALL;
    pub const PRODUCT_ONLY: &'static [Operation] = &[Operation::Licenses];

    pub fn name(self) -> &'static str {
        match self {
            Operation::Policies => "policies",
            Operation::Endpoints => "endpoints",
            Operation::Accounts => "accounts",
            Operation::Companies => "companies",
            Operation::CustomGroups => "custom_groups",
            Operation::Packages => "packages",
            Operation::InstallationLinks => "installation_links",
            Operation::Quarantine => "quarantine",
            Operation::NetworkInventory => "network_inventory",
            Operation::ScanTasks => "scan_tasks",
            Operation::Licenses => "licenses",
        }
    }

    pub fn staleness_interval(self) -> Duration {
        match self {
            Operation::Policies => warden_config::POLICIES_INTERVAL,
            Operation::Endpoints => warden_config::ENDPOINTS_INTERVAL,
            Operation::Accounts => warden_config::ACCOUNTS_INTERVAL,
            Operation::Companies => warden_config::COMPANIES_INTERVAL,
            Operation::CustomGroups => warden_config::CUSTOM_GROUPS_INTERVAL,
            Operation::Packages => warden_config::PACKAGES_INTERVAL,
            Operation::InstallationLinks => warden_config::INSTALLATION_LINKS_INTERVAL,
            Operation::Quarantine => warden_config::QUARANTINE_INTERVAL,
            Operation::NetworkInventory => warden_config::NETWORK_INVENTORY_INTERVAL,
            Operation::ScanTasks => warden_config::SCAN_TASKS_INTERVAL,
            Operation::Licenses => warden_config::LICENSES_INTERVAL,
        }
    }

    pub fn remote_call(self) -> RemoteCall {
        let (service, method) = match self {
            Operation::Policies => ("policies", "getPoliciesList"),
            Operation::Endpoints => ("network", "getEndpointsList"),
            Operation::Accounts => ("accounts", "getAccountsList"),
            Operation::Companies => ("companies", "getCompanyDetails"),
            Operation::CustomGroups => ("network", "getCustomGroupsList"),
            Operation::Packages => ("packages", "getPackagesList"),
            Operation::InstallationLinks => ("packages", "getInstallationLinks"),
            Operation::Quarantine => ("quarantine/computers", "getQuarantineItemsList"),
            Operation::NetworkInventory => ("network", "getNetworkInventoryItems"),
            Operation::ScanTasks => ("network", "getScanTasksList"),
            Operation::Licenses => ("licensing", "getLicenseInfo"),
        };
        RemoteCall { service, method }
    }

    pub fn payload_shape(self) -> PayloadShape {
        match self {
            Operation::Companies | Operation::Licenses => PayloadShape::Single,
            Operation::CustomGroups | Operation::InstallationLinks => PayloadShape::List,
            _ => PayloadShape::Paged,
        }
    }

    pub fn merge_pattern(self) -> MergePattern {
        match self {
            Operation::Endpoints | Operation::NetworkInventory => MergePattern::Tombstone,
            _ => MergePattern::Upsert,
        }
    }

    /// An operation with no checkpoint is always due. Otherwise it is due once
    /// `now - last_sync` reaches the staleness interval.
    pub fn is_due(self, last_sync: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last_sync {
            None => true,
            Some(last) => {
                let interval =
                    TimeDelta::from_std(self.staleness_interval()).unwrap_or(TimeDelta::MAX);
                now.signed_duration_since(last) >= interval
            }
        }
    }

    /// When the operation becomes due again after a sync at `last_sync`.
    pub fn next_due(self, last_sync: DateTime<Utc>) -> DateTime<Utc> {
        let interval = TimeDelta::from_std(self.staleness_interval()).unwrap_or(TimeDelta::MAX);
        last_sync
            .checked_add_signed(interval)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation '{0}'")]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        Operation::ALL
            .into_iter()
            .find(|op| op.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| UnknownOperation(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn policies_precede_endpoints() {
        let pos = |op| Operation::ALL.iter().position(|o| *o == op).unwrap();
        assert!(pos(Operation::Policies) < pos(Operation::Endpoints));
    }

    #[test]
    fn due_when_never_synced() {
        assert!(Operation::Licenses.is_due(None, t0()));
    }

    #[test]
    fn not_due_inside_interval() {
        let last = t0();
        let now = last + TimeDelta::minutes(4);
        assert!(!Operation::Endpoints.is_due(Some(last), now));
        assert!(Operation::Endpoints.is_due(Some(last), last + TimeDelta::minutes(5)));
    }

    #[test]
    fn intervals_match_declared_cadence() {
        assert_eq!(
            Operation::Endpoints.staleness_interval(),
            Duration::from_secs(300)
        );
        assert_eq!(
            Operation::Accounts.staleness_interval(),
            Duration::from_secs(3600)
        );
        assert_eq!(
            Operation::Policies.staleness_interval(),
            Duration::from_secs(7200)
        );
        assert_eq!(
            Operation::Licenses.staleness_interval(),
            Duration::from_secs(86400)
        );
    }

    #[test]
    fn parses_names_and_dashes() {
        assert_eq!(
            "network-inventory".parse::<Operation>().unwrap(),
            Operation::NetworkInventory
        );
        assert_eq!("Policies".parse::<Operation>().unwrap(), Operation::Policies);
        assert!("nope".parse::<Operation>().is_err());
    }

    #[test]
    fn next_due_adds_interval() {
        assert_eq!(
            Operation::Endpoints.next_due(t0()),
            t0() + TimeDelta::minutes(5)
        );
    }
}
