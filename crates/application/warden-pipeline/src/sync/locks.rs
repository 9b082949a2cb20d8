use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OwnedMutexGuard;

type LockMap = HashMap<String, Arc<tokio::sync::Mutex<()>>>;

/// One async mutex per tenant; at most one pass (or tenant-scoped command) per
/// tenant runs at a time. Different tenants never block each other.
///
/// Entries live only while someone holds or waits for them.
#[derive(Debug, Default)]
pub struct TenantLocks {
    inner: Mutex<LockMap>,
}

/// Held for the duration of a tenant-scoped pass.
pub struct TenantGuard<'a> {
    locks: &'a TenantLocks,
    tenant_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl TenantLocks {
    fn map(&self) -> MutexGuard<'_, LockMap> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn acquire(&self, tenant_id: &str) -> TenantGuard<'_> {
        let lock = self.map().entry(tenant_id.to_string()).or_default().clone();
        let guard = lock.lock_owned().await;
        TenantGuard {
            locks: self,
            tenant_id: tenant_id.to_string(),
            guard: Some(guard),
        }
    }
}

impl Drop for TenantGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut map = self.locks.map();
        // Waiters hold a clone, so the map's own reference being the last one
        // means nobody else wants this tenant.
        if map
            .get(&self.tenant_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&self.tenant_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_tenant_is_exclusive_other_tenants_are_not() {
        let locks = TenantLocks::default();
        let guard = locks.acquire("t1").await;
        let blocked = tokio::time::timeout(Duration::from_millis(20), locks.acquire("t1")).await;
        assert!(blocked.is_err());
        let other = tokio::time::timeout(Duration::from_millis(20), locks.acquire("t2")).await;
        assert!(other.is_ok());
        drop(other);
        drop(guard);
        let again = tokio::time::timeout(Duration::from_millis(20), locks.acquire("t1")).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn released_tenants_leave_no_entry() {
        let locks = TenantLocks::default();
        for i in 0..50 {
            let _guard = locks.acquire(&format!("tenant-{i}")).await;
        }
        assert!(locks.map().is_empty());
    }

    #[tokio::test]
    async fn entry_survives_while_a_waiter_is_queued() {
        let locks = Arc::new(TenantLocks::default());
        let first = locks.acquire("t1").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("t1").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(first);
        assert!(locks.map().contains_key("t1"), "queued waiter still needs it");

        waiter.await.unwrap();
        assert!(locks.map().is_empty());
    }
}
