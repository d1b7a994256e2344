//! Cached Catalog Client
//!
//! `CachedCatalog` is the only way handlers reach catalog data. Reads go
//! through the [`ReadThroughCache`] under the keys of [`CacheKey`]; writes
//! go to the relational store first and purge the affected keys only after
//! the write has committed.
//!
//! Composite reads (a product with its relations, a warehouse with its
//! products) use the cached row and load the relation collections from the
//! store on every call.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;
use venntry_core::{Category, Inventory, Product, StorageResult, User, Warehouse};
use venntry_storage::{
    create_product, update_product, CacheConfig, CacheKey, CacheStats, CacheStore, CatalogStore,
    InvalidationCoordinator, ProductWrite, ReadThroughCache, StorageFetcher,
};

// ============================================================================
// CACHED CATALOG
// ============================================================================

/// Catalog facade combining the relational store, the read-through cache and
/// the invalidation coordinator.
///
/// # Usage
///
/// ```ignore
/// // Reads populate the cache on a miss
/// let products = catalog.product_list(inventory_id).await?;
///
/// // Writes commit first, then purge stale keys
/// let product = catalog.product_create(write).await?;
/// ```
#[derive(Clone)]
pub struct CachedCatalog {
    store: Arc<dyn CatalogStore>,
    cache: ReadThroughCache,
    invalidator: InvalidationCoordinator,
}

impl CachedCatalog {
    /// Create a catalog over a store and a cache backend.
    pub fn new(
        store: Arc<dyn CatalogStore>,
        cache_store: Arc<dyn CacheStore>,
        config: CacheConfig,
    ) -> Self {
        Self {
            store,
            cache: ReadThroughCache::new(cache_store.clone(), config),
            invalidator: InvalidationCoordinator::new(cache_store),
        }
    }

    /// Get the underlying relational store.
    ///
    /// Uniqueness checks and account lookups go here directly and never
    /// through the cache.
    pub fn store(&self) -> &dyn CatalogStore {
        self.store.as_ref()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub async fn ping(&self) -> StorageResult<()> {
        self.store.ping().await
    }

    // ========================================================================
    // PRODUCTS
    // ========================================================================

    /// Products of an inventory, newest first.
    pub async fn product_list(&self, inventory_id: Uuid) -> StorageResult<Vec<Product>> {
        let fetcher = ProductListFetcher {
            store: self.store(),
            inventory_id,
        };
        self.cache
            .get(&CacheKey::products(inventory_id), &fetcher)
            .await
    }

    /// Product row without relations.
    pub async fn product_get(&self, id: Uuid) -> StorageResult<Product> {
        let fetcher = ProductFetcher {
            store: self.store(),
            id,
        };
        self.cache.get(&CacheKey::product(id), &fetcher).await
    }

    /// Cached product row plus images, categories and warehouses loaded
    /// from the store.
    pub async fn product_get_with_relations(&self, id: Uuid) -> StorageResult<Product> {
        let mut product = self.product_get(id).await?;
        product.images = self.store.product_images(id).await?;
        product.categories = self.store.product_categories(id).await?;
        product.warehouses = self.store.product_warehouses(id).await?;
        Ok(product)
    }

    /// Create a product with its relations.
    ///
    /// Returns the written product with images and categories attached.
    pub async fn product_create(&self, write: ProductWrite) -> StorageResult<Product> {
        let product = create_product(self.store(), write).await?;
        self.invalidator
            .product_changed(product.id, product.inventory_id)
            .await;
        tracing::info!(product_id = %product.id, inventory_id = %product.inventory_id, "product created");
        Ok(product)
    }

    /// Replace a product and its relations, then re-read it.
    pub async fn product_update(&self, write: ProductWrite) -> StorageResult<Product> {
        let written = update_product(self.store(), write).await?;
        self.invalidator
            .product_changed(written.id, written.inventory_id)
            .await;
        tracing::info!(product_id = %written.id, "product updated");
        self.product_get_with_relations(written.id).await
    }

    /// Delete a product. NotFound when absent.
    pub async fn product_delete(&self, id: Uuid) -> StorageResult<()> {
        let existing = self.product_get(id).await?;
        self.store.product_delete(id).await?;
        self.invalidator
            .product_changed(id, existing.inventory_id)
            .await;
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }

    /// Set the stock of a product in one warehouse.
    pub async fn product_stock_update(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
    ) -> StorageResult<()> {
        self.store
            .warehouse_stock_update(product_id, warehouse_id, quantity)
            .await?;
        self.invalidator.product_stock_changed(product_id).await;
        Ok(())
    }

    // ========================================================================
    // CATEGORIES
    // ========================================================================

    pub async fn category_list(&self, inventory_id: Uuid) -> StorageResult<Vec<Category>> {
        let fetcher = CategoryListFetcher {
            store: self.store(),
            inventory_id,
        };
        self.cache
            .get(&CacheKey::categories(inventory_id), &fetcher)
            .await
    }

    // ========================================================================
    // WAREHOUSES
    // ========================================================================

    pub async fn warehouse_list(&self, inventory_id: Uuid) -> StorageResult<Vec<Warehouse>> {
        let fetcher = WarehouseListFetcher {
            store: self.store(),
            inventory_id,
        };
        self.cache
            .get(&CacheKey::warehouses(inventory_id), &fetcher)
            .await
    }

    pub async fn warehouse_get(&self, id: Uuid) -> StorageResult<Warehouse> {
        let fetcher = WarehouseFetcher {
            store: self.store(),
            id,
        };
        self.cache.get(&CacheKey::warehouse(id), &fetcher).await
    }

    /// Cached warehouse row plus its stocked products from the store.
    pub async fn warehouse_get_with_products(&self, id: Uuid) -> StorageResult<Warehouse> {
        let mut warehouse = self.warehouse_get(id).await?;
        warehouse.products = self.store.warehouse_products(id).await?;
        Ok(warehouse)
    }

    pub async fn warehouse_create(&self, warehouse: Warehouse) -> StorageResult<Warehouse> {
        self.store.warehouse_insert(&warehouse).await?;
        self.invalidator
            .warehouse_changed(warehouse.id, warehouse.inventory_id)
            .await;
        tracing::info!(warehouse_id = %warehouse.id, "warehouse created");
        Ok(warehouse)
    }

    pub async fn warehouse_update(&self, warehouse: Warehouse) -> StorageResult<Warehouse> {
        self.store.warehouse_update(&warehouse).await?;
        self.invalidator
            .warehouse_changed(warehouse.id, warehouse.inventory_id)
            .await;
        Ok(warehouse)
    }

    pub async fn warehouse_delete(&self, id: Uuid) -> StorageResult<()> {
        let existing = self.warehouse_get(id).await?;
        self.store.warehouse_delete(id).await?;
        self.invalidator
            .warehouse_changed(id, existing.inventory_id)
            .await;
        tracing::info!(warehouse_id = %id, "warehouse deleted");
        Ok(())
    }

    // ========================================================================
    // INVENTORIES
    // ========================================================================

    pub async fn inventory_list(&self, user_id: Uuid) -> StorageResult<Vec<Inventory>> {
        let fetcher = InventoryListFetcher {
            store: self.store(),
            user_id,
        };
        self.cache
            .get(&CacheKey::inventories(user_id), &fetcher)
            .await
    }

    pub async fn inventory_get(&self, id: Uuid) -> StorageResult<Inventory> {
        let fetcher = InventoryFetcher {
            store: self.store(),
            id,
        };
        self.cache.get(&CacheKey::inventory(id), &fetcher).await
    }

    pub async fn inventory_create(&self, inventory: Inventory) -> StorageResult<Inventory> {
        self.store.inventory_insert(&inventory).await?;
        self.invalidator
            .inventory_changed(inventory.id, inventory.user_id)
            .await;
        tracing::info!(inventory_id = %inventory.id, "inventory created");
        Ok(inventory)
    }

    pub async fn inventory_update(&self, inventory: Inventory) -> StorageResult<Inventory> {
        self.store.inventory_update(&inventory).await?;
        self.invalidator
            .inventory_changed(inventory.id, inventory.user_id)
            .await;
        Ok(inventory)
    }

    /// Delete an inventory and purge every key of its children.
    ///
    /// Child ids are read from the store before the delete; the cached
    /// listings may be stale or absent.
    pub async fn inventory_delete(&self, id: Uuid) -> StorageResult<()> {
        let inventory = self.inventory_get(id).await?;
        let product_ids: Vec<Uuid> = self
            .store
            .product_list(id)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();
        let warehouse_ids: Vec<Uuid> = self
            .store
            .warehouse_list(id)
            .await?
            .into_iter()
            .map(|w| w.id)
            .collect();

        self.store.inventory_delete(id).await?;
        self.invalidator
            .inventory_removed(id, inventory.user_id, &product_ids, &warehouse_ids)
            .await;
        tracing::info!(
            inventory_id = %id,
            products = product_ids.len(),
            warehouses = warehouse_ids.len(),
            "inventory deleted"
        );
        Ok(())
    }

    // ========================================================================
    // USERS (uncached)
    // ========================================================================

    pub async fn user_create(&self, user: User) -> StorageResult<User> {
        self.store.user_insert(&user).await?;
        Ok(user)
    }

    pub async fn user_get(&self, id: Uuid) -> StorageResult<User> {
        self.store.user_get(id).await
    }
}

// ============================================================================
// STORAGE FETCHERS
// ============================================================================

struct ProductListFetcher<'a> {
    store: &'a dyn CatalogStore,
    inventory_id: Uuid,
}

#[async_trait]
impl StorageFetcher<Vec<Product>> for ProductListFetcher<'_> {
    async fn fetch(&self) -> StorageResult<Vec<Product>> {
        self.store.product_list(self.inventory_id).await
    }
}

struct ProductFetcher<'a> {
    store: &'a dyn CatalogStore,
    id: Uuid,
}

#[async_trait]
impl StorageFetcher<Product> for ProductFetcher<'_> {
    async fn fetch(&self) -> StorageResult<Product> {
        self.store.product_get(self.id).await
    }
}

struct CategoryListFetcher<'a> {
    store: &'a dyn CatalogStore,
    inventory_id: Uuid,
}

#[async_trait]
impl StorageFetcher<Vec<Category>> for CategoryListFetcher<'_> {
    async fn fetch(&self) -> StorageResult<Vec<Category>> {
        self.store.category_list(self.inventory_id).await
    }
}

struct WarehouseListFetcher<'a> {
    store: &'a dyn CatalogStore,
    inventory_id: Uuid,
}

#[async_trait]
impl StorageFetcher<Vec<Warehouse>> for WarehouseListFetcher<'_> {
    async fn fetch(&self) -> StorageResult<Vec<Warehouse>> {
        self.store.warehouse_list(self.inventory_id).await
    }
}

struct WarehouseFetcher<'a> {
    store: &'a dyn CatalogStore,
    id: Uuid,
}

#[async_trait]
impl StorageFetcher<Warehouse> for WarehouseFetcher<'_> {
    async fn fetch(&self) -> StorageResult<Warehouse> {
        self.store.warehouse_get(self.id).await
    }
}

struct InventoryListFetcher<'a> {
    store: &'a dyn CatalogStore,
    user_id: Uuid,
}

#[async_trait]
impl StorageFetcher<Vec<Inventory>> for InventoryListFetcher<'_> {
    async fn fetch(&self) -> StorageResult<Vec<Inventory>> {
        self.store.inventory_list(self.user_id).await
    }
}

struct InventoryFetcher<'a> {
    store: &'a dyn CatalogStore,
    id: Uuid,
}

#[async_trait]
impl StorageFetcher<Inventory> for InventoryFetcher<'_> {
    async fn fetch(&self) -> StorageResult<Inventory> {
        self.store.inventory_get(self.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use venntry_core::{new_entity_id, now};
    use venntry_storage::{InMemoryCacheStore, MockCatalogStore};
    use venntry_test_utils::fixtures;

    fn catalog_over(store: &MockCatalogStore) -> (CachedCatalog, Arc<InMemoryCacheStore>) {
        let cache = Arc::new(InMemoryCacheStore::new());
        let catalog = CachedCatalog::new(
            Arc::new(store.clone()),
            cache.clone(),
            CacheConfig::default(),
        );
        (catalog, cache)
    }

    #[tokio::test]
    async fn test_warehouse_create_purges_listing() {
        let (store, _user, inventory, _warehouse) = fixtures::seeded_store();
        let (catalog, cache) = catalog_over(&store);

        let before = catalog.warehouse_list(inventory.id).await.unwrap();
        assert_eq!(before.len(), 1);
        assert!(cache
            .get(CacheKey::warehouses(inventory.id).as_str())
            .await
            .unwrap()
            .is_some());

        catalog
            .warehouse_create(fixtures::warehouse(inventory.id, "South"))
            .await
            .unwrap();

        assert!(cache
            .get(CacheKey::warehouses(inventory.id).as_str())
            .await
            .unwrap()
            .is_none());
        assert_eq!(catalog.warehouse_list(inventory.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_stock_update_purges_only_product_row() {
        let (store, _user, inventory, warehouse) = fixtures::seeded_store();
        let (catalog, cache) = catalog_over(&store);

        let product = catalog
            .product_create(ProductWrite {
                product: fixtures::product(inventory.id, "Widget", "W-1"),
                images: Vec::new(),
                category_names: Vec::new(),
                warehouse_ids: vec![warehouse.id],
            })
            .await
            .unwrap();
        catalog.product_get(product.id).await.unwrap();
        catalog.product_list(inventory.id).await.unwrap();

        catalog
            .product_stock_update(product.id, warehouse.id, 7)
            .await
            .unwrap();

        assert!(cache
            .get(CacheKey::product(product.id).as_str())
            .await
            .unwrap()
            .is_none());
        assert!(cache
            .get(CacheKey::products(inventory.id).as_str())
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_inventory_delete_purges_children() {
        let (store, user, inventory, warehouse) = fixtures::seeded_store();
        let (catalog, cache) = catalog_over(&store);

        let product = catalog
            .product_create(ProductWrite {
                product: fixtures::product(inventory.id, "Widget", "W-1"),
                images: Vec::new(),
                category_names: vec!["Tools".into()],
                warehouse_ids: Vec::new(),
            })
            .await
            .unwrap();
        catalog.product_get(product.id).await.unwrap();
        catalog.warehouse_get(warehouse.id).await.unwrap();
        catalog.inventory_list(user.id).await.unwrap();
        catalog.category_list(inventory.id).await.unwrap();

        catalog.inventory_delete(inventory.id).await.unwrap();

        for key in [
            CacheKey::inventory(inventory.id),
            CacheKey::inventories(user.id),
            CacheKey::products(inventory.id),
            CacheKey::categories(inventory.id),
            CacheKey::warehouses(inventory.id),
            CacheKey::product(product.id),
            CacheKey::warehouse(warehouse.id),
        ] {
            assert!(cache.get(key.as_str()).await.unwrap().is_none(), "{key}");
        }
        assert!(catalog
            .product_get(product.id)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_delete_missing_product_is_not_found() {
        let (store, ..) = fixtures::seeded_store();
        let (catalog, _) = catalog_over(&store);

        let err = catalog.product_delete(new_entity_id()).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.calls("product_delete"), 0);
    }

    #[tokio::test]
    async fn test_product_update_returns_fresh_relations() {
        let (store, _user, inventory, warehouse) = fixtures::seeded_store();
        let (catalog, _) = catalog_over(&store);

        let created = catalog
            .product_create(ProductWrite {
                product: fixtures::product(inventory.id, "Widget", "W-1"),
                images: Vec::new(),
                category_names: vec!["Tools".into()],
                warehouse_ids: Vec::new(),
            })
            .await
            .unwrap();
        let first_read = catalog.product_get_with_relations(created.id).await.unwrap();
        assert!(first_read.warehouses.is_empty());

        let mut row = created.without_relations();
        row.name = "Widget Pro".into();
        row.updated_at = now();
        let updated = catalog
            .product_update(ProductWrite {
                product: row,
                images: Vec::new(),
                category_names: vec!["Hardware".into()],
                warehouse_ids: vec![warehouse.id],
            })
            .await
            .unwrap();

        assert_eq!(updated.name, "Widget Pro");
        assert_eq!(updated.categories.len(), 1);
        assert_eq!(updated.categories[0].name, "Hardware");
        assert_eq!(updated.warehouses.len(), 1);
    }
}
