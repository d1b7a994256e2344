//! In-memory catalog store for tests.
//!
//! Behaves like the relational store for everything the catalog relies on:
//! NotFound on absent rows, foreign-key failures reported with SQLSTATE
//! 23503, cascading deletes, and transactions that stage their changes on a
//! copy of the tables and publish them on commit. Failures can be injected
//! at any transaction step, and every call is counted so tests can assert
//! whether a read reached the store at all.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;
use venntry_core::{
    Category, EntityType, Image, Inventory, Product, ProductField, StorageError, StorageResult,
    User, Warehouse,
};

use crate::store::{CatalogStore, CatalogTransaction};

/// Transaction step that can be forced to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Begin,
    InsertProduct,
    UpdateProduct,
    InsertImage,
    InsertCategory,
    LinkCategory,
    LinkWarehouse,
    Commit,
}

impl FailPoint {
    fn injected_error(&self) -> StorageError {
        let (sqlstate, message) = match self {
            FailPoint::LinkWarehouse | FailPoint::LinkCategory => (
                "23503",
                "insert violates foreign key constraint (injected)",
            ),
            FailPoint::InsertCategory | FailPoint::InsertProduct => (
                "23505",
                "duplicate key value violates unique constraint (injected)",
            ),
            FailPoint::Commit => (
                "40001",
                "could not serialize access due to concurrent update (injected)",
            ),
            FailPoint::Begin | FailPoint::UpdateProduct | FailPoint::InsertImage => {
                ("08006", "connection failure (injected)")
            }
        };
        StorageError::database(format!("{:?}", self), Some(sqlstate.to_string()), message)
    }
}

#[derive(Debug, Clone, Default)]
struct CatalogTables {
    users: HashMap<Uuid, User>,
    inventories: HashMap<Uuid, Inventory>,
    products: HashMap<Uuid, Product>,
    images: Vec<Image>,
    categories: HashMap<Uuid, Category>,
    /// (product_id, category_id)
    product_categories: Vec<(Uuid, Uuid)>,
    warehouses: HashMap<Uuid, Warehouse>,
    /// (product_id, warehouse_id, quantity)
    warehouse_products: Vec<(Uuid, Uuid, i32)>,
}

impl CatalogTables {
    fn remove_product(&mut self, id: Uuid) -> bool {
        let existed = self.products.remove(&id).is_some();
        self.clear_relations(id);
        existed
    }

    fn clear_relations(&mut self, product_id: Uuid) {
        self.images.retain(|i| i.product_id != product_id);
        self.product_categories.retain(|(p, _)| *p != product_id);
        self.warehouse_products.retain(|(p, _, _)| *p != product_id);
    }

    fn require_inventory(&self, inventory_id: Uuid, operation: &str) -> StorageResult<()> {
        if self.inventories.contains_key(&inventory_id) {
            Ok(())
        } else {
            Err(fk_violation(operation, "inventory_id"))
        }
    }
}

fn fk_violation(operation: &str, column: &str) -> StorageError {
    StorageError::database(
        operation,
        Some("23503".to_string()),
        format!("insert or update violates foreign key constraint on {}", column),
    )
}

fn unique_violation(operation: &str, constraint: &str) -> StorageError {
    StorageError::database(
        operation,
        Some("23505".to_string()),
        format!(
            "duplicate key value violates unique constraint \"{}\"",
            constraint
        ),
    )
}

fn not_found(entity_type: EntityType, id: Uuid) -> StorageError {
    StorageError::NotFound { entity_type, id }
}

#[derive(Default)]
struct MockState {
    tables: Mutex<CatalogTables>,
    faults: Mutex<Vec<FailPoint>>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

/// Cloneable handle; clones share tables, faults and counters.
#[derive(Clone, Default)]
pub struct MockCatalogStore {
    state: Arc<MockState>,
}

impl MockCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next occurrence of `point` fail with a database error.
    pub fn fail_next(&self, point: FailPoint) {
        if let Ok(mut faults) = self.state.faults.lock() {
            faults.push(point);
        }
    }

    /// Number of calls made to the named operation.
    pub fn calls(&self, operation: &str) -> usize {
        self.state
            .calls
            .lock()
            .map(|calls| calls.get(operation).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Number of calls made to any operation.
    pub fn total_calls(&self) -> usize {
        self.state
            .calls
            .lock()
            .map(|calls| calls.values().sum())
            .unwrap_or(0)
    }

    pub fn reset_calls(&self) {
        if let Ok(mut calls) = self.state.calls.lock() {
            calls.clear();
        }
    }

    pub fn seed_user(&self, user: User) {
        if let Ok(mut tables) = self.state.tables.lock() {
            tables.users.insert(user.id, user);
        }
    }

    pub fn seed_inventory(&self, inventory: Inventory) {
        if let Ok(mut tables) = self.state.tables.lock() {
            tables.inventories.insert(inventory.id, inventory);
        }
    }

    pub fn seed_warehouse(&self, warehouse: Warehouse) {
        if let Ok(mut tables) = self.state.tables.lock() {
            tables.warehouses.insert(warehouse.id, warehouse);
        }
    }

    fn record(&self, operation: &'static str) {
        if let Ok(mut calls) = self.state.calls.lock() {
            *calls.entry(operation).or_insert(0) += 1;
        }
    }

    fn tables(&self) -> StorageResult<MutexGuard<'_, CatalogTables>> {
        self.state
            .tables
            .lock()
            .map_err(|_| StorageError::LockPoisoned)
    }

    fn take_fault(state: &MockState, point: FailPoint) -> StorageResult<()> {
        let mut faults = state.faults.lock().map_err(|_| StorageError::LockPoisoned)?;
        match faults.iter().position(|p| *p == point) {
            Some(idx) => {
                faults.remove(idx);
                Err(point.injected_error())
            }
            None => Ok(()),
        }
    }
}

fn newest_first<T, F>(mut rows: Vec<T>, created_at: F) -> Vec<T>
where
    F: Fn(&T) -> venntry_core::Timestamp,
{
    rows.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    rows
}

#[async_trait]
impl CatalogStore for MockCatalogStore {
    async fn ping(&self) -> StorageResult<()> {
        self.record("ping");
        Ok(())
    }

    async fn product_list(&self, inventory_id: Uuid) -> StorageResult<Vec<Product>> {
        self.record("product_list");
        let tables = self.tables()?;
        let rows = tables
            .products
            .values()
            .filter(|p| p.inventory_id == inventory_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |p: &Product| p.created_at))
    }

    async fn product_get(&self, id: Uuid) -> StorageResult<Product> {
        self.record("product_get");
        self.tables()?
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(EntityType::Product, id))
    }

    async fn product_images(&self, product_id: Uuid) -> StorageResult<Vec<Image>> {
        self.record("product_images");
        Ok(self
            .tables()?
            .images
            .iter()
            .filter(|i| i.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn product_categories(&self, product_id: Uuid) -> StorageResult<Vec<Category>> {
        self.record("product_categories");
        let tables = self.tables()?;
        let mut rows: Vec<Category> = tables
            .product_categories
            .iter()
            .filter(|(p, _)| *p == product_id)
            .filter_map(|(_, c)| tables.categories.get(c).cloned())
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn product_warehouses(&self, product_id: Uuid) -> StorageResult<Vec<Warehouse>> {
        self.record("product_warehouses");
        let tables = self.tables()?;
        let mut rows: Vec<Warehouse> = tables
            .warehouse_products
            .iter()
            .filter(|(p, _, _)| *p == product_id)
            .filter_map(|(_, w, _)| tables.warehouses.get(w).cloned())
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn product_field_exists(
        &self,
        field: ProductField,
        value: &str,
        inventory_id: Uuid,
        exclude_id: Option<Uuid>,
    ) -> StorageResult<bool> {
        self.record("product_field_exists");
        let tables = self.tables()?;
        Ok(tables.products.values().any(|p| {
            let current = match field {
                ProductField::Name => Some(p.name.as_str()),
                ProductField::Sku => Some(p.sku.as_str()),
                ProductField::Code => p.code.as_deref(),
            };
            p.inventory_id == inventory_id
                && current == Some(value)
                && Some(p.id) != exclude_id
        }))
    }

    async fn product_delete(&self, id: Uuid) -> StorageResult<()> {
        self.record("product_delete");
        if self.tables()?.remove_product(id) {
            Ok(())
        } else {
            Err(not_found(EntityType::Product, id))
        }
    }

    async fn warehouse_stock_update(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
    ) -> StorageResult<()> {
        self.record("warehouse_stock_update");
        let mut tables = self.tables()?;
        match tables
            .warehouse_products
            .iter_mut()
            .find(|(p, w, _)| *p == product_id && *w == warehouse_id)
        {
            Some(link) => {
                link.2 = quantity;
                Ok(())
            }
            None => Err(not_found(EntityType::Warehouse, warehouse_id)),
        }
    }

    async fn category_list(&self, inventory_id: Uuid) -> StorageResult<Vec<Category>> {
        self.record("category_list");
        let mut rows: Vec<Category> = self
            .tables()?
            .categories
            .values()
            .filter(|c| c.inventory_id == inventory_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn warehouse_list(&self, inventory_id: Uuid) -> StorageResult<Vec<Warehouse>> {
        self.record("warehouse_list");
        let rows = self
            .tables()?
            .warehouses
            .values()
            .filter(|w| w.inventory_id == inventory_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |w: &Warehouse| w.created_at))
    }

    async fn warehouse_get(&self, id: Uuid) -> StorageResult<Warehouse> {
        self.record("warehouse_get");
        self.tables()?
            .warehouses
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(EntityType::Warehouse, id))
    }

    async fn warehouse_products(&self, warehouse_id: Uuid) -> StorageResult<Vec<Product>> {
        self.record("warehouse_products");
        let tables = self.tables()?;
        let rows = tables
            .warehouse_products
            .iter()
            .filter(|(_, w, _)| *w == warehouse_id)
            .filter_map(|(p, _, _)| tables.products.get(p).cloned())
            .collect();
        Ok(newest_first(rows, |p: &Product| p.created_at))
    }

    async fn warehouse_name_exists(
        &self,
        name: &str,
        inventory_id: Uuid,
        exclude_id: Option<Uuid>,
    ) -> StorageResult<bool> {
        self.record("warehouse_name_exists");
        Ok(self.tables()?.warehouses.values().any(|w| {
            w.inventory_id == inventory_id && w.name == name && Some(w.id) != exclude_id
        }))
    }

    async fn warehouse_insert(&self, warehouse: &Warehouse) -> StorageResult<()> {
        self.record("warehouse_insert");
        let mut tables = self.tables()?;
        tables.require_inventory(warehouse.inventory_id, "warehouse_insert")?;
        let mut row = warehouse.clone();
        row.products.clear();
        tables.warehouses.insert(row.id, row);
        Ok(())
    }

    async fn warehouse_update(&self, warehouse: &Warehouse) -> StorageResult<()> {
        self.record("warehouse_update");
        let mut tables = self.tables()?;
        let row = tables
            .warehouses
            .get_mut(&warehouse.id)
            .ok_or_else(|| not_found(EntityType::Warehouse, warehouse.id))?;
        row.name = warehouse.name.clone();
        row.location = warehouse.location.clone();
        row.capacity = warehouse.capacity;
        row.updated_at = warehouse.updated_at;
        Ok(())
    }

    async fn warehouse_delete(&self, id: Uuid) -> StorageResult<()> {
        self.record("warehouse_delete");
        let mut tables = self.tables()?;
        if tables.warehouses.remove(&id).is_none() {
            return Err(not_found(EntityType::Warehouse, id));
        }
        tables.warehouse_products.retain(|(_, w, _)| *w != id);
        Ok(())
    }

    async fn inventory_list(&self, user_id: Uuid) -> StorageResult<Vec<Inventory>> {
        self.record("inventory_list");
        let rows = self
            .tables()?
            .inventories
            .values()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |i: &Inventory| i.created_at))
    }

    async fn inventory_get(&self, id: Uuid) -> StorageResult<Inventory> {
        self.record("inventory_get");
        self.tables()?
            .inventories
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(EntityType::Inventory, id))
    }

    async fn inventory_insert(&self, inventory: &Inventory) -> StorageResult<()> {
        self.record("inventory_insert");
        self.tables()?
            .inventories
            .insert(inventory.id, inventory.clone());
        Ok(())
    }

    async fn inventory_update(&self, inventory: &Inventory) -> StorageResult<()> {
        self.record("inventory_update");
        let mut tables = self.tables()?;
        let row = tables
            .inventories
            .get_mut(&inventory.id)
            .ok_or_else(|| not_found(EntityType::Inventory, inventory.id))?;
        row.name = inventory.name.clone();
        row.updated_at = inventory.updated_at;
        Ok(())
    }

    async fn inventory_delete(&self, id: Uuid) -> StorageResult<()> {
        self.record("inventory_delete");
        let mut tables = self.tables()?;
        if tables.inventories.remove(&id).is_none() {
            return Err(not_found(EntityType::Inventory, id));
        }
        let product_ids: Vec<Uuid> = tables
            .products
            .values()
            .filter(|p| p.inventory_id == id)
            .map(|p| p.id)
            .collect();
        for product_id in product_ids {
            tables.remove_product(product_id);
        }
        tables.categories.retain(|_, c| c.inventory_id != id);
        let warehouse_ids: Vec<Uuid> = tables
            .warehouses
            .values()
            .filter(|w| w.inventory_id == id)
            .map(|w| w.id)
            .collect();
        for warehouse_id in warehouse_ids {
            tables.warehouses.remove(&warehouse_id);
            tables.warehouse_products.retain(|(_, w, _)| *w != warehouse_id);
        }
        Ok(())
    }

    async fn user_insert(&self, user: &User) -> StorageResult<()> {
        self.record("user_insert");
        let mut tables = self.tables()?;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(unique_violation("user_insert", "users_email_key"));
        }
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(unique_violation("user_insert", "users_username_key"));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn user_get(&self, id: Uuid) -> StorageResult<User> {
        self.record("user_get");
        self.tables()?
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(EntityType::User, id))
    }

    async fn user_get_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        self.record("user_get_by_email");
        Ok(self
            .tables()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn username_exists(&self, username: &str) -> StorageResult<bool> {
        self.record("username_exists");
        Ok(self.tables()?.users.values().any(|u| u.username == username))
    }

    async fn email_exists(&self, email: &str) -> StorageResult<bool> {
        self.record("email_exists");
        Ok(self.tables()?.users.values().any(|u| u.email == email))
    }

    async fn begin(&self) -> StorageResult<Box<dyn CatalogTransaction>> {
        self.record("begin");
        Self::take_fault(&self.state, FailPoint::Begin)?;
        let staged = self.tables()?.clone();
        Ok(Box::new(MockTransaction {
            store: self.clone(),
            staged,
        }))
    }
}

/// Transaction over a private copy of the tables.
///
/// Commit replaces the shared tables with the staged copy; rollback and drop
/// discard it. Concurrent transactions are last-writer-wins, which is enough
/// for single-task tests.
struct MockTransaction {
    store: MockCatalogStore,
    staged: CatalogTables,
}

impl MockTransaction {
    fn step(&self, operation: &'static str, point: FailPoint) -> StorageResult<()> {
        self.store.record(operation);
        MockCatalogStore::take_fault(&self.store.state, point)
    }
}

#[async_trait]
impl CatalogTransaction for MockTransaction {
    async fn insert_product(&mut self, product: &Product) -> StorageResult<()> {
        self.step("insert_product", FailPoint::InsertProduct)?;
        self.staged
            .require_inventory(product.inventory_id, "insert_product")?;
        if self.staged.products.contains_key(&product.id) {
            return Err(unique_violation("insert_product", "products_pkey"));
        }
        self.staged
            .products
            .insert(product.id, product.without_relations());
        Ok(())
    }

    async fn update_product(&mut self, product: &Product) -> StorageResult<u64> {
        self.step("update_product", FailPoint::UpdateProduct)?;
        match self.staged.products.get_mut(&product.id) {
            Some(row) => {
                let created_at = row.created_at;
                *row = product.without_relations();
                row.created_at = created_at;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn clear_product_relations(&mut self, product_id: Uuid) -> StorageResult<()> {
        self.store.record("clear_product_relations");
        self.staged.clear_relations(product_id);
        Ok(())
    }

    async fn insert_image(&mut self, image: &Image) -> StorageResult<()> {
        self.step("insert_image", FailPoint::InsertImage)?;
        if !self.staged.products.contains_key(&image.product_id) {
            return Err(fk_violation("insert_image", "product_id"));
        }
        self.staged.images.push(image.clone());
        Ok(())
    }

    async fn find_category(
        &mut self,
        name: &str,
        inventory_id: Uuid,
    ) -> StorageResult<Option<Category>> {
        self.store.record("find_category");
        Ok(self
            .staged
            .categories
            .values()
            .find(|c| c.name == name && c.inventory_id == inventory_id)
            .cloned())
    }

    async fn insert_category(&mut self, category: &Category) -> StorageResult<()> {
        self.step("insert_category", FailPoint::InsertCategory)?;
        self.staged
            .require_inventory(category.inventory_id, "insert_category")?;
        self.staged.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn link_category(&mut self, product_id: Uuid, category_id: Uuid) -> StorageResult<()> {
        self.step("link_category", FailPoint::LinkCategory)?;
        if !self.staged.categories.contains_key(&category_id) {
            return Err(fk_violation("link_category", "category_id"));
        }
        self.staged.product_categories.push((product_id, category_id));
        Ok(())
    }

    async fn link_warehouse(
        &mut self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> StorageResult<()> {
        self.step("link_warehouse", FailPoint::LinkWarehouse)?;
        if !self.staged.warehouses.contains_key(&warehouse_id) {
            return Err(fk_violation("link_warehouse", "warehouse_id"));
        }
        self.staged
            .warehouse_products
            .push((product_id, warehouse_id, 0));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StorageResult<()> {
        self.step("commit", FailPoint::Commit)?;
        let MockTransaction { store, staged } = *self;
        *store.tables()? = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StorageResult<()> {
        self.store.record("rollback");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use venntry_core::{new_entity_id, now};

    fn inventory() -> Inventory {
        let ts = now();
        Inventory {
            id: new_entity_id(),
            name: "Main".into(),
            user_id: new_entity_id(),
            created_at: ts,
            updated_at: ts,
        }
    }

    #[tokio::test]
    async fn test_absent_rows_are_not_found() {
        let store = MockCatalogStore::new();
        let id = new_entity_id();
        assert!(store.product_get(id).await.unwrap_err().is_not_found());
        assert!(store.warehouse_get(id).await.unwrap_err().is_not_found());
        assert!(store.inventory_get(id).await.unwrap_err().is_not_found());
        assert!(store.product_delete(id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_calls_are_counted() {
        let store = MockCatalogStore::new();
        let inv = inventory();
        store.inventory_insert(&inv).await.unwrap();
        store.product_list(inv.id).await.unwrap();
        store.product_list(inv.id).await.unwrap();
        assert_eq!(store.calls("product_list"), 2);
        assert_eq!(store.total_calls(), 3);
        store.reset_calls();
        assert_eq!(store.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_changes() {
        let store = MockCatalogStore::new();
        let inv = inventory();
        store.seed_inventory(inv.clone());
        {
            let mut tx = store.begin().await.unwrap();
            let ts = now();
            tx.insert_category(&Category {
                id: new_entity_id(),
                name: "Tools".into(),
                inventory_id: inv.id,
                created_at: ts,
                updated_at: ts,
            })
            .await
            .unwrap();
        }
        assert!(store.category_list(inv.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_warehouse_insert_requires_inventory() {
        let store = MockCatalogStore::new();
        let ts = now();
        let warehouse = Warehouse {
            id: new_entity_id(),
            name: "North".into(),
            location: None,
            capacity: Some(10),
            inventory_id: new_entity_id(),
            created_at: ts,
            updated_at: ts,
            products: Vec::new(),
        };
        let err = store.warehouse_insert(&warehouse).await.unwrap_err();
        assert_eq!(err.db_kind(), Some(venntry_core::DbErrorKind::ForeignKey));
    }

    #[tokio::test]
    async fn test_injected_fault_fires_once() {
        let store = MockCatalogStore::new();
        store.fail_next(FailPoint::Begin);
        assert!(store.begin().await.is_err());
        assert!(store.begin().await.is_ok());
    }
}
