pub mod rpc;
pub mod tenants;

// Re-exports for convenience
pub use rpc::{JsonRpcClient, RpcError, RpcErrorObject};
pub use tenants::{FileTenantRegistry, TenantStoreError};
