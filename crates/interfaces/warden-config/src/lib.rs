//! Central configuration constants for runtime limits and defaults.

use std::time::Duration;

/// Default JSON-RPC base URL; each remote service is a path segment below it.
pub const DEFAULT_API_URL: &str = "https://cloud.gravityzone.bitdefender.com/api/v1.0/jsonrpc";

/// Default address for the inbound sync trigger.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8087";

/// File name of the local store inside the data directory.
pub const STORE_FILENAME: &str = "warden.redb";

/// File name of the tenant registry inside the config directory.
pub const TENANTS_FILENAME: &str = "tenants.json";

/// Items requested per page for paged listings.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Upper bound accepted by the remote API for `perPage`.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Per-request timeout for remote calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote calls allowed per second for a single API key.
pub const REQUESTS_PER_SECOND: u32 = 10;

/// Concurrent detail lookups within a single operation.
pub const DETAIL_FETCH_CONCURRENCY: usize = 4;

// Staleness intervals. Fixed per operation.
pub const POLICIES_INTERVAL: Duration = Duration::from_secs(2 * 60 * 60);
pub const ENDPOINTS_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const ACCOUNTS_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub const COMPANIES_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);
pub const CUSTOM_GROUPS_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub const PACKAGES_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);
pub const INSTALLATION_LINKS_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);
pub const QUARANTINE_INTERVAL: Duration = Duration::from_secs(15 * 60);
pub const NETWORK_INVENTORY_INTERVAL: Duration = Duration::from_secs(30 * 60);
pub const SCAN_TASKS_INTERVAL: Duration = Duration::from_secs(10 * 60);
pub const LICENSES_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Convenience function to clamp a page size into the allowed range.
pub fn clamp_page_size(v: u32) -> u32 {
    v.clamp(1, MAX_PAGE_SIZE)
}
