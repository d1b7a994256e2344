//! Relational store boundary.
//!
//! [`CatalogStore`] covers single-statement reads and writes plus existence
//! checks. Multi-statement product writes go through a
//! [`CatalogTransaction`] obtained from [`CatalogStore::begin`].
//!
//! Implementations report failures as [`StorageError`] values that keep the
//! raw SQLSTATE and driver message; callers classify them with
//! [`venntry_core::DbErrorKind`].

use async_trait::async_trait;
use uuid::Uuid;
use venntry_core::{
    Category, Image, Inventory, Product, ProductField, StorageResult, User, Warehouse,
};

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Cheap connectivity check.
    async fn ping(&self) -> StorageResult<()>;

    // === Products ===

    /// Product rows of an inventory, newest first, without relations.
    async fn product_list(&self, inventory_id: Uuid) -> StorageResult<Vec<Product>>;

    /// Single product row without relations. NotFound when absent.
    async fn product_get(&self, id: Uuid) -> StorageResult<Product>;

    async fn product_images(&self, product_id: Uuid) -> StorageResult<Vec<Image>>;

    async fn product_categories(&self, product_id: Uuid) -> StorageResult<Vec<Category>>;

    async fn product_warehouses(&self, product_id: Uuid) -> StorageResult<Vec<Warehouse>>;

    /// True when another product in the inventory already uses `value` for
    /// `field`. `exclude_id` skips the product being updated.
    async fn product_field_exists(
        &self,
        field: ProductField,
        value: &str,
        inventory_id: Uuid,
        exclude_id: Option<Uuid>,
    ) -> StorageResult<bool>;

    /// Delete a product and its relation rows. NotFound when absent.
    async fn product_delete(&self, id: Uuid) -> StorageResult<()>;

    /// Set the stocked quantity of a product in one warehouse. NotFound when
    /// the product is not linked to the warehouse.
    async fn warehouse_stock_update(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
    ) -> StorageResult<()>;

    /// Categories of an inventory ordered by name.
    async fn category_list(&self, inventory_id: Uuid) -> StorageResult<Vec<Category>>;

    // === Warehouses ===

    async fn warehouse_list(&self, inventory_id: Uuid) -> StorageResult<Vec<Warehouse>>;

    async fn warehouse_get(&self, id: Uuid) -> StorageResult<Warehouse>;

    /// Product rows stocked in a warehouse.
    async fn warehouse_products(&self, warehouse_id: Uuid) -> StorageResult<Vec<Product>>;

    async fn warehouse_name_exists(
        &self,
        name: &str,
        inventory_id: Uuid,
        exclude_id: Option<Uuid>,
    ) -> StorageResult<bool>;

    async fn warehouse_insert(&self, warehouse: &Warehouse) -> StorageResult<()>;

    /// Update name, location and capacity. NotFound when absent.
    async fn warehouse_update(&self, warehouse: &Warehouse) -> StorageResult<()>;

    async fn warehouse_delete(&self, id: Uuid) -> StorageResult<()>;

    // === Inventories ===

    async fn inventory_list(&self, user_id: Uuid) -> StorageResult<Vec<Inventory>>;

    async fn inventory_get(&self, id: Uuid) -> StorageResult<Inventory>;

    async fn inventory_insert(&self, inventory: &Inventory) -> StorageResult<()>;

    async fn inventory_update(&self, inventory: &Inventory) -> StorageResult<()>;

    /// Delete an inventory. Children go with it through cascading foreign keys.
    async fn inventory_delete(&self, id: Uuid) -> StorageResult<()>;

    // === Users ===

    async fn user_insert(&self, user: &User) -> StorageResult<()>;

    async fn user_get(&self, id: Uuid) -> StorageResult<User>;

    async fn user_get_by_email(&self, email: &str) -> StorageResult<Option<User>>;

    async fn username_exists(&self, username: &str) -> StorageResult<bool>;

    async fn email_exists(&self, email: &str) -> StorageResult<bool>;

    // === Transactions ===

    /// Open a transaction for a multi-statement write.
    async fn begin(&self) -> StorageResult<Box<dyn CatalogTransaction>>;
}

/// Statement-level steps of the product write path, all inside one
/// relational transaction.
///
/// Dropping a transaction without calling [`commit`](Self::commit) or
/// [`rollback`](Self::rollback) must leave the store unchanged.
#[async_trait]
pub trait CatalogTransaction: Send {
    async fn insert_product(&mut self, product: &Product) -> StorageResult<()>;

    /// Update the product row; returns the number of affected rows.
    async fn update_product(&mut self, product: &Product) -> StorageResult<u64>;

    /// Remove images, category links and warehouse links of a product.
    async fn clear_product_relations(&mut self, product_id: Uuid) -> StorageResult<()>;

    async fn insert_image(&mut self, image: &Image) -> StorageResult<()>;

    /// Exact, case-sensitive lookup by name within an inventory.
    async fn find_category(
        &mut self,
        name: &str,
        inventory_id: Uuid,
    ) -> StorageResult<Option<Category>>;

    async fn insert_category(&mut self, category: &Category) -> StorageResult<()>;

    async fn link_category(&mut self, product_id: Uuid, category_id: Uuid) -> StorageResult<()>;

    /// Link a product to a warehouse with zero stock.
    async fn link_warehouse(&mut self, product_id: Uuid, warehouse_id: Uuid)
        -> StorageResult<()>;

    async fn commit(self: Box<Self>) -> StorageResult<()>;

    async fn rollback(self: Box<Self>) -> StorageResult<()>;
}
