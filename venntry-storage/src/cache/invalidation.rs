//! Post-commit cache invalidation.
//!
//! Each mutation kind maps to the fixed set of keys whose cached value may
//! now be stale. Invalidation only runs after the relational write has
//! committed, so a failure here is logged and swallowed.

use std::sync::Arc;

use uuid::Uuid;

use super::keys::CacheKey;
use super::traits::CacheStore;

#[derive(Clone)]
pub struct InvalidationCoordinator {
    store: Arc<dyn CacheStore>,
}

impl InvalidationCoordinator {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Delete every key, continuing past failures.
    pub async fn invalidate(&self, keys: &[CacheKey]) {
        for key in keys {
            match self.store.delete(key.as_str()).await {
                Ok(()) => tracing::debug!(key = %key, "cache key invalidated"),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "cache invalidation failed")
                }
            }
        }
    }

    /// Keys purged when a product is created, updated or deleted.
    ///
    /// The category listing is included because a product write may create
    /// categories by name.
    pub fn product_keys(product_id: Uuid, inventory_id: Uuid) -> Vec<CacheKey> {
        vec![
            CacheKey::product(product_id),
            CacheKey::products(inventory_id),
            CacheKey::categories(inventory_id),
        ]
    }

    pub fn warehouse_keys(warehouse_id: Uuid, inventory_id: Uuid) -> Vec<CacheKey> {
        vec![
            CacheKey::warehouse(warehouse_id),
            CacheKey::warehouses(inventory_id),
        ]
    }

    pub fn inventory_keys(inventory_id: Uuid, user_id: Uuid) -> Vec<CacheKey> {
        vec![
            CacheKey::inventory(inventory_id),
            CacheKey::inventories(user_id),
        ]
    }

    /// Keys purged when an inventory and all of its children are removed.
    pub fn inventory_removal_keys(
        inventory_id: Uuid,
        user_id: Uuid,
        product_ids: &[Uuid],
        warehouse_ids: &[Uuid],
    ) -> Vec<CacheKey> {
        let mut keys = Self::inventory_keys(inventory_id, user_id);
        keys.push(CacheKey::products(inventory_id));
        keys.push(CacheKey::categories(inventory_id));
        keys.push(CacheKey::warehouses(inventory_id));
        keys.extend(product_ids.iter().copied().map(CacheKey::product));
        keys.extend(warehouse_ids.iter().copied().map(CacheKey::warehouse));
        keys
    }

    pub async fn product_changed(&self, product_id: Uuid, inventory_id: Uuid) {
        self.invalidate(&Self::product_keys(product_id, inventory_id))
            .await;
    }

    /// Stock moves only change the product row.
    pub async fn product_stock_changed(&self, product_id: Uuid) {
        self.invalidate(&[CacheKey::product(product_id)]).await;
    }

    pub async fn warehouse_changed(&self, warehouse_id: Uuid, inventory_id: Uuid) {
        self.invalidate(&Self::warehouse_keys(warehouse_id, inventory_id))
            .await;
    }

    pub async fn inventory_changed(&self, inventory_id: Uuid, user_id: Uuid) {
        self.invalidate(&Self::inventory_keys(inventory_id, user_id))
            .await;
    }

    pub async fn inventory_removed(
        &self,
        inventory_id: Uuid,
        user_id: Uuid,
        product_ids: &[Uuid],
        warehouse_ids: &[Uuid],
    ) {
        let keys =
            Self::inventory_removal_keys(inventory_id, user_id, product_ids, warehouse_ids);
        self.invalidate(&keys).await;
    }
}
