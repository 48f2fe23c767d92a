//! In-memory catalog store

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use order_agent_core::{CatalogStore, Product, StoreError};

/// Tenant → product list, held in memory. A tenant with no rows gets an
/// empty list, which disables catalog enforcement for that tenant only.
#[derive(Default)]
pub struct InMemoryCatalogStore {
    products: RwLock<HashMap<String, Vec<Product>>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_products(&self, tenant: impl Into<String>, products: Vec<Product>) {
        self.products.write().insert(tenant.into(), products);
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn list_products(&self, tenant: &str) -> Result<Vec<Product>, StoreError> {
        Ok(self
            .products
            .read()
            .get(tenant)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_tenant_is_empty_not_error() {
        let store = InMemoryCatalogStore::new();
        let products = store.list_products("nobody").await.unwrap();
        assert!(products.is_empty());
    }

    #[tokio::test]
    async fn test_roundtrip() {
        let store = InMemoryCatalogStore::new();
        store.set_products("t1", vec![Product::new("p1", "onion", "Onion")]);
        let products = store.list_products("t1").await.unwrap();
        assert_eq!(products.len(), 1);
    }
}
