//! Venntry Test Utilities
//!
//! Centralized test infrastructure for the Venntry workspace:
//! - A scriptable fake cache store with failure toggles
//! - Proptest generators for all catalog entities
//! - Test fixtures for common scenarios
//! - Custom assertions for storage results

// Re-export the mock relational store from its source crate
pub use venntry_storage::{FailPoint, MockCatalogStore};

// Re-export core types for convenience
pub use venntry_core::{
    Category, EntityType, Image, ImageInput, Inventory, Product, StorageError, StorageResult,
    Timestamp, User, Warehouse,
};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use venntry_core::{CacheError, CacheResult};
use venntry_storage::CacheStore;

// ============================================================================
// FAKE CACHE STORE
// ============================================================================

/// Cache store with switchable failures and operation counters.
///
/// TTLs are recorded but never enforced.
#[derive(Default)]
pub struct FakeCacheStore {
    entries: Mutex<HashMap<String, (Vec<u8>, Duration)>>,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
    fail_delete: AtomicBool,
    gets: AtomicUsize,
    sets: AtomicUsize,
    deletes: AtomicUsize,
}

impl FakeCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose get, set and delete all fail.
    pub fn unavailable() -> Self {
        let store = Self::default();
        store.set_failures(true, true, true);
        store
    }

    pub fn set_failures(&self, get: bool, set: bool, delete: bool) {
        self.fail_get.store(get, Ordering::SeqCst);
        self.fail_set.store(set, Ordering::SeqCst);
        self.fail_delete.store(delete, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }

    /// Sorted list of stored keys.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).map(|(_, ttl)| *ttl))
    }

    /// Overwrite a raw payload, bypassing failure toggles.
    pub fn insert_raw(&self, key: &str, value: Vec<u8>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), (value, Duration::ZERO));
        }
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn set_count(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    fn failure(op: &str) -> CacheError {
        CacheError::Backend {
            reason: format!("{} unavailable (fake)", op),
        }
    }

    fn lock_failure() -> CacheError {
        CacheError::Backend {
            reason: "fake cache lock poisoned".to_string(),
        }
    }
}

#[async_trait]
impl CacheStore for FakeCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(Self::failure("get"));
        }
        let entries = self.entries.lock().map_err(|_| Self::lock_failure())?;
        Ok(entries.get(key).map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(Self::failure("set"));
        }
        let mut entries = self.entries.lock().map_err(|_| Self::lock_failure())?;
        entries.insert(key.to_string(), (value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Self::failure("delete"));
        }
        let mut entries = self.entries.lock().map_err(|_| Self::lock_failure())?;
        entries.remove(key);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "fake"
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating catalog entities.

    use super::*;
    use proptest::option;
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Generate a random UUID.
    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    /// Generate a Timestamp with microsecond precision (2020-2030).
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64, 0u32..1_000_000).prop_map(|(secs, micros)| {
            chrono::DateTime::from_timestamp(secs, micros * 1_000)
                .unwrap_or_else(chrono::Utc::now)
        })
    }

    /// Generate text of at most `max` characters, including non-ASCII and
    /// control characters.
    pub fn arb_text(max: usize) -> impl Strategy<Value = String> {
        prop::collection::vec(any::<char>(), 0..=max)
            .prop_map(|chars| chars.into_iter().collect::<String>())
    }

    pub fn arb_image() -> impl Strategy<Value = Image> {
        (
            arb_uuid(),
            arb_text(80),
            arb_text(40),
            arb_uuid(),
            any::<bool>(),
            arb_timestamp(),
            arb_timestamp(),
        )
            .prop_map(
                |(id, url, file_key, product_id, is_primary, created_at, updated_at)| Image {
                    id,
                    url,
                    file_key,
                    product_id,
                    is_primary,
                    created_at,
                    updated_at,
                },
            )
    }

    pub fn arb_category() -> impl Strategy<Value = Category> {
        (
            arb_uuid(),
            arb_text(50),
            arb_uuid(),
            arb_timestamp(),
            arb_timestamp(),
        )
            .prop_map(|(id, name, inventory_id, created_at, updated_at)| Category {
                id,
                name,
                inventory_id,
                created_at,
                updated_at,
            })
    }

    /// Warehouse without nested products.
    pub fn arb_warehouse() -> impl Strategy<Value = Warehouse> {
        (
            arb_uuid(),
            arb_text(50),
            option::of(arb_text(200)),
            option::of(0i32..1_000_000),
            arb_uuid(),
            arb_timestamp(),
            arb_timestamp(),
        )
            .prop_map(
                |(id, name, location, capacity, inventory_id, created_at, updated_at)| Warehouse {
                    id,
                    name,
                    location,
                    capacity,
                    inventory_id,
                    created_at,
                    updated_at,
                    products: Vec::new(),
                },
            )
    }

    /// Product row without relations.
    pub fn arb_product_row() -> impl Strategy<Value = Product> {
        let text = (
            arb_uuid(),
            arb_text(100),
            arb_text(50),
            option::of(arb_text(50)),
            option::of(arb_text(50)),
            option::of(arb_text(50)),
            option::of(arb_text(200)),
        );
        let numbers = (
            any::<i32>(),
            any::<i32>(),
            any::<i32>(),
            any::<i64>(),
            any::<i64>(),
            arb_uuid(),
            arb_timestamp(),
            arb_timestamp(),
        );
        (text, numbers).prop_map(
            |(
                (id, name, sku, code, brand, model, description),
                (quantity, restock_level, optimal_level, cost, price, inventory_id, created_at, updated_at),
            )| Product {
                id,
                name,
                sku,
                code,
                brand,
                model,
                description,
                quantity,
                restock_level,
                optimal_level,
                cost,
                price,
                inventory_id,
                created_at,
                updated_at,
                images: Vec::new(),
                categories: Vec::new(),
                warehouses: Vec::new(),
            },
        )
    }

    /// Product with images, categories and warehouse links.
    pub fn arb_product() -> impl Strategy<Value = Product> {
        (
            arb_product_row(),
            prop::collection::vec(arb_image(), 0..4),
            prop::collection::vec(arb_category(), 0..4),
            prop::collection::vec(arb_warehouse(), 0..3),
        )
            .prop_map(|(mut product, images, categories, warehouses)| {
                product.images = images;
                product.categories = categories;
                product.warehouses = warehouses;
                product
            })
    }

    /// Warehouse with nested product rows.
    pub fn arb_warehouse_with_products() -> impl Strategy<Value = Warehouse> {
        (arb_warehouse(), prop::collection::vec(arb_product_row(), 0..3)).prop_map(
            |(mut warehouse, products)| {
                warehouse.products = products;
                warehouse
            },
        )
    }

    pub fn arb_inventory() -> impl Strategy<Value = Inventory> {
        (
            arb_uuid(),
            arb_text(100),
            arb_uuid(),
            arb_timestamp(),
            arb_timestamp(),
        )
            .prop_map(|(id, name, user_id, created_at, updated_at)| Inventory {
                id,
                name,
                user_id,
                created_at,
                updated_at,
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;
    use uuid::Uuid;
    use venntry_core::{new_entity_id, now};

    pub fn user(username: &str) -> User {
        let ts = now();
        User {
            id: new_entity_id(),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: String::new(),
            role: "user".to_string(),
            avatar: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    pub fn inventory(user_id: Uuid, name: &str) -> Inventory {
        let ts = now();
        Inventory {
            id: new_entity_id(),
            name: name.to_string(),
            user_id,
            created_at: ts,
            updated_at: ts,
        }
    }

    pub fn warehouse(inventory_id: Uuid, name: &str) -> Warehouse {
        let ts = now();
        Warehouse {
            id: new_entity_id(),
            name: name.to_string(),
            location: Some("Dock 4".to_string()),
            capacity: Some(500),
            inventory_id,
            created_at: ts,
            updated_at: ts,
            products: Vec::new(),
        }
    }

    /// Product row with default stock levels and no relations.
    pub fn product(inventory_id: Uuid, name: &str, sku: &str) -> Product {
        let ts = now();
        Product {
            id: new_entity_id(),
            name: name.to_string(),
            sku: sku.to_string(),
            code: None,
            brand: None,
            model: None,
            description: None,
            quantity: 5,
            restock_level: 10,
            optimal_level: 100,
            cost: 1000,
            price: 1500,
            inventory_id,
            created_at: ts,
            updated_at: ts,
            images: Vec::new(),
            categories: Vec::new(),
            warehouses: Vec::new(),
        }
    }

    pub fn image(url: &str) -> ImageInput {
        ImageInput {
            url: url.to_string(),
            file_key: url.rsplit('/').next().unwrap_or(url).to_string(),
        }
    }

    /// Mock store seeded with one user, one inventory and one warehouse.
    pub fn seeded_store() -> (MockCatalogStore, User, Inventory, Warehouse) {
        let store = MockCatalogStore::new();
        let owner = user("owner");
        let inv = inventory(owner.id, "Main");
        let wh = warehouse(inv.id, "North");
        store.seed_user(owner.clone());
        store.seed_inventory(inv.clone());
        store.seed_warehouse(wh.clone());
        (store, owner, inv, wh)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for storage results.

    use super::*;

    /// Assert that a StorageResult is a NotFound error for the entity type.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &StorageResult<T>, entity_type: EntityType) {
        match result {
            Err(StorageError::NotFound {
                entity_type: et, ..
            }) => {
                assert_eq!(*et, entity_type, "Wrong entity type in NotFound error");
            }
            other => panic!("Expected NotFound error for {:?}, got: {:?}", entity_type, other),
        }
    }

    /// Assert that a StorageResult is a database error with the SQLSTATE.
    #[track_caller]
    pub fn assert_sqlstate<T: std::fmt::Debug>(result: &StorageResult<T>, code: &str) {
        match result {
            Err(StorageError::Database { sqlstate, .. }) => {
                assert_eq!(sqlstate.as_deref(), Some(code), "Wrong SQLSTATE");
            }
            other => panic!("Expected Database error {}, got: {:?}", code, other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_fake_cache_store_round_trip() {
        let store = FakeCacheStore::new();
        store
            .set("k", b"v".to_vec(), Duration::from_secs(3))
            .await
            .unwrap();
        assert!(store.contains("k"));
        assert_eq!(store.ttl_of("k"), Some(Duration::from_secs(3)));
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
        store.delete("k").await.unwrap();
        assert!(!store.contains("k"));
        assert_eq!(store.get_count(), 1);
        assert_eq!(store.set_count(), 1);
        assert_eq!(store.delete_count(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_everything() {
        let store = FakeCacheStore::unavailable();
        assert!(store.get("k").await.is_err());
        assert!(store.set("k", Vec::new(), Duration::ZERO).await.is_err());
        assert!(store.delete("k").await.is_err());
        assert!(store.keys().is_empty());
    }

    #[test]
    fn test_seeded_store_fixture() {
        let (_store, owner, inv, wh) = fixtures::seeded_store();
        assert_eq!(inv.user_id, owner.id);
        assert_eq!(wh.inventory_id, inv.id);
    }

    proptest! {
        #[test]
        fn prop_generated_products_keep_text_limits(product in generators::arb_product()) {
            prop_assert!(product.name.chars().count() <= 100);
            prop_assert!(product.sku.chars().count() <= 50);
            prop_assert!(product.images.len() < 4);
        }
    }
}
