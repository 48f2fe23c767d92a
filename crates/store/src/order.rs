//! In-memory order store
//!
//! Reference implementation of `OrderStore`: versioned compare-and-swap
//! updates and the idempotent inbound-event fingerprint set.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use order_agent_core::{Order, OrderStore, StoreError};

#[derive(Default)]
pub struct InMemoryOrderStore {
    /// (tenant, order id) → order
    orders: RwLock<HashMap<(String, String), Order>>,
    /// Seen inbound-event fingerprints
    fingerprints: RwLock<HashSet<String>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: &Order) -> Result<(), StoreError> {
        let key = (order.tenant.clone(), order.id.clone());
        self.orders.write().insert(key, order.clone());
        Ok(())
    }

    async fn get(&self, tenant: &str, order_id: &str) -> Result<Option<Order>, StoreError> {
        Ok(self
            .orders
            .read()
            .get(&(tenant.to_string(), order_id.to_string()))
            .cloned())
    }

    async fn find_last_for_customer(
        &self,
        tenant: &str,
        source_identity: &str,
    ) -> Result<Option<Order>, StoreError> {
        Ok(self
            .orders
            .read()
            .values()
            .filter(|o| o.tenant == tenant && o.source_identity == source_identity)
            .max_by_key(|o| o.last_inbound_at)
            .cloned())
    }

    async fn update(&self, order: &Order) -> Result<Order, StoreError> {
        let key = (order.tenant.clone(), order.id.clone());
        let mut orders = self.orders.write();
        let stored = orders
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(order.id.clone()))?;

        if stored.version != order.version {
            return Err(StoreError::VersionConflict {
                order_id: order.id.clone(),
                expected: order.version,
                found: stored.version,
            });
        }

        let mut updated = order.clone();
        updated.version += 1;
        *stored = updated.clone();
        Ok(updated)
    }

    async fn seen_fingerprint(&self, fingerprint: &str) -> Result<bool, StoreError> {
        Ok(self.fingerprints.read().contains(fingerprint))
    }

    async fn insert_fingerprint(&self, fingerprint: &str) -> Result<bool, StoreError> {
        Ok(self.fingerprints.write().insert(fingerprint.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_create_and_find_last() {
        let store = InMemoryOrderStore::new();
        let now = Utc::now();

        let mut older = Order::new("t1", "c1", now - chrono::Duration::minutes(30));
        older.touch_inbound(now - chrono::Duration::minutes(30));
        let newer = Order::new("t1", "c1", now);

        store.create(&older).await.unwrap();
        store.create(&newer).await.unwrap();

        let found = store.find_last_for_customer("t1", "c1").await.unwrap().unwrap();
        assert_eq!(found.id, newer.id);
    }

    #[tokio::test]
    async fn test_cas_conflict() {
        let store = InMemoryOrderStore::new();
        let order = Order::new("t1", "c1", Utc::now());
        store.create(&order).await.unwrap();

        // First writer wins and bumps the version.
        let updated = store.update(&order).await.unwrap();
        assert_eq!(updated.version, 1);

        // Second writer still holds version 0.
        let err = store.update(&order).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));
    }

    #[tokio::test]
    async fn test_fingerprint_idempotence() {
        let store = InMemoryOrderStore::new();
        assert!(!store.seen_fingerprint("abc").await.unwrap());
        assert!(store.insert_fingerprint("abc").await.unwrap());
        assert!(store.seen_fingerprint("abc").await.unwrap());
        assert!(!store.insert_fingerprint("abc").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_missing_order() {
        let store = InMemoryOrderStore::new();
        let order = Order::new("t1", "c1", Utc::now());
        let err = store.update(&order).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
