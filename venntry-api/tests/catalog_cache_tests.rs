//! Read-through caching and write invalidation through `CachedCatalog`.

use std::sync::Arc;

use regex::Regex;
use venntry_api::validation::ProductValidator;
use venntry_api::CachedCatalog;
use venntry_storage::{CacheConfig, CacheKey, CatalogStore, ProductWrite};
use venntry_test_utils::assertions::{assert_not_found, assert_sqlstate};
use venntry_test_utils::{
    fixtures, EntityType, FailPoint, FakeCacheStore, Inventory, MockCatalogStore, Warehouse,
};

struct Harness {
    store: MockCatalogStore,
    cache: Arc<FakeCacheStore>,
    catalog: CachedCatalog,
    inventory: Inventory,
    warehouse: Warehouse,
}

fn harness_with(cache: FakeCacheStore) -> Harness {
    let (store, _user, inventory, warehouse) = fixtures::seeded_store();
    let cache = Arc::new(cache);
    let catalog = CachedCatalog::new(Arc::new(store.clone()), cache.clone(), CacheConfig::default());
    Harness {
        store,
        cache,
        catalog,
        inventory,
        warehouse,
    }
}

fn harness() -> Harness {
    harness_with(FakeCacheStore::new())
}

fn widget_write(h: &Harness, sku: &str) -> ProductWrite {
    ProductWrite {
        product: fixtures::product(h.inventory.id, "Widget", sku),
        images: vec![fixtures::image("https://cdn.example.com/widget.png")],
        category_names: vec!["Tools".to_string()],
        warehouse_ids: vec![h.warehouse.id],
    }
}

#[tokio::test]
async fn test_miss_populates_exactly_one_key() {
    let h = harness();
    h.catalog.product_list(h.inventory.id).await.unwrap();

    assert_eq!(
        h.cache.keys(),
        vec![CacheKey::products(h.inventory.id).as_str().to_string()]
    );
    assert_eq!(
        h.cache.ttl_of(CacheKey::products(h.inventory.id).as_str()),
        Some(CacheConfig::default().entry_ttl)
    );
}

#[tokio::test]
async fn test_hit_skips_the_store() {
    let h = harness();
    let created = h.catalog.product_create(widget_write(&h, "W-1")).await.unwrap();

    let first = h.catalog.product_get(created.id).await.unwrap();
    let calls = h.store.calls("product_get");
    let (gets, sets) = (h.cache.get_count(), h.cache.set_count());
    let second = h.catalog.product_get(created.id).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(h.store.calls("product_get"), calls);
    assert_eq!(h.cache.get_count(), gets + 1);
    assert_eq!(h.cache.set_count(), sets);
}

#[tokio::test]
async fn test_create_purges_every_affected_key() {
    let h = harness();
    let mut write = widget_write(&h, "W-1");
    write.category_names = vec!["Tools".to_string(), "Bolts".to_string()];
    let product_key = CacheKey::product(write.product.id);

    h.catalog.product_list(h.inventory.id).await.unwrap();
    h.catalog.category_list(h.inventory.id).await.unwrap();
    h.cache.insert_raw(product_key.as_str(), b"{}".to_vec());
    assert_eq!(h.cache.keys().len(), 3);

    h.catalog.product_create(write).await.unwrap();

    assert!(!h.cache.contains(CacheKey::products(h.inventory.id).as_str()));
    assert!(!h.cache.contains(CacheKey::categories(h.inventory.id).as_str()));
    assert!(!h.cache.contains(product_key.as_str()));

    let categories = h.store.category_list(h.inventory.id).await.unwrap();
    let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Bolts", "Tools"]);
}

#[tokio::test]
async fn test_undecodable_entry_is_reloaded_and_repaired() {
    let h = harness();
    let created = h.catalog.product_create(widget_write(&h, "W-1")).await.unwrap();
    let key = CacheKey::product(created.id);
    h.cache.insert_raw(key.as_str(), b"not json".to_vec());
    let calls = h.store.calls("product_get");

    let fetched = h.catalog.product_get(created.id).await.unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(h.store.calls("product_get"), calls + 1);

    h.catalog.product_get(created.id).await.unwrap();
    assert_eq!(h.store.calls("product_get"), calls + 1);
}

#[tokio::test]
async fn test_update_purges_product_row() {
    let h = harness();
    let created = h.catalog.product_create(widget_write(&h, "W-1")).await.unwrap();
    h.catalog.product_get(created.id).await.unwrap();

    let mut write = widget_write(&h, "W-1");
    write.product.id = created.id;
    write.product.description = Some("Now blue".to_string());
    h.catalog.product_update(write).await.unwrap();

    let fresh = h.catalog.product_get(created.id).await.unwrap();
    assert_eq!(fresh.description.as_deref(), Some("Now blue"));
}

#[tokio::test]
async fn test_failed_write_leaves_no_partial_state() {
    let h = harness();
    h.catalog.product_list(h.inventory.id).await.unwrap();
    h.store.fail_next(FailPoint::LinkCategory);

    let result = h.catalog.product_create(widget_write(&h, "W-1")).await;
    assert_sqlstate(&result, "23503");

    assert!(h.store.product_list(h.inventory.id).await.unwrap().is_empty());
    assert!(h.store.category_list(h.inventory.id).await.unwrap().is_empty());
    assert!(h.catalog.product_list(h.inventory.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unavailable_cache_degrades_to_store() {
    let h = harness_with(FakeCacheStore::unavailable());

    let created = h.catalog.product_create(widget_write(&h, "W-1")).await.unwrap();
    let listed = h.catalog.product_list(h.inventory.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(h.catalog.product_get(created.id).await.unwrap().id, created.id);

    h.catalog.product_list(h.inventory.id).await.unwrap();
    assert_eq!(h.store.calls("product_list"), 2);
    assert!(h.catalog.cache_stats().errors >= 2);
    assert!(h.cache.keys().is_empty());
}

#[tokio::test]
async fn test_failed_invalidation_does_not_fail_the_write() {
    let h = harness();
    h.cache.set_failures(false, false, true);

    let created = h.catalog.product_create(widget_write(&h, "W-1")).await.unwrap();
    let deletes = h.cache.delete_count();
    h.catalog.product_delete(created.id).await.unwrap();

    assert_eq!(h.cache.delete_count(), deletes + 3);
    assert_not_found(&h.store.product_get(created.id).await, EntityType::Product);
}

#[tokio::test]
async fn test_delete_twice_is_not_found_and_cache_stays_clean() {
    let h = harness();
    let created = h.catalog.product_create(widget_write(&h, "W-1")).await.unwrap();
    h.catalog.product_get(created.id).await.unwrap();

    h.catalog.product_delete(created.id).await.unwrap();
    assert!(!h.cache.contains(CacheKey::product(created.id).as_str()));

    let second = h.catalog.product_delete(created.id).await;
    assert_not_found(&second, EntityType::Product);
    assert!(h.catalog.product_list(h.inventory.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_widget_scenario() {
    let h = harness();
    let code_pattern = Regex::new(r"^WID-[0-9A-Z]{7}$").unwrap();

    let mut write = widget_write(&h, "W-1");
    write.product.restock_level = 0;
    write.product.optimal_level = 0;
    ProductValidator::new(h.catalog.store())
        .validate(&mut write.product, None)
        .await
        .unwrap();
    let created = h.catalog.product_create(write).await.unwrap();

    let code = created.code.clone().unwrap_or_default();
    assert!(code_pattern.is_match(&code), "{code}");
    assert_eq!(created.restock_level, 10);
    assert_eq!(created.optimal_level, 100);

    let listed = h.catalog.product_list(h.inventory.id).await.unwrap();
    let calls = h.store.calls("product_list");
    let again = h.catalog.product_list(h.inventory.id).await.unwrap();
    assert_eq!(listed, again);
    assert_eq!(h.store.calls("product_list"), calls);

    let full = h.catalog.product_get_with_relations(created.id).await.unwrap();
    assert_eq!(full.images.len(), 1);
    assert_eq!(full.categories[0].name, "Tools");
    assert_eq!(full.warehouses[0].id, h.warehouse.id);
}
