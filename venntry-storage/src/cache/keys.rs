//! Cache key scheme.
//!
//! One rule per shape:
//!
//! - single entity: `{entity}:{id}`
//! - listing scoped to a parent: `{entity}s:{parent_id}`
//! - secondary listing scoped to a parent: `{secondary}s:{parent_id}`
//!
//! Keys are derived only from stable identifiers, so a key names exactly one
//! relational query.

use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    fn single(entity: &str, id: Uuid) -> Self {
        CacheKey(format!("{}:{}", entity, id))
    }

    fn listing(entity: &str, parent_id: Uuid) -> Self {
        CacheKey(format!("{}s:{}", entity, parent_id))
    }

    /// `product:{id}` - a product row without relations.
    pub fn product(id: Uuid) -> Self {
        Self::single("product", id)
    }

    /// `products:{inventory_id}` - products of an inventory, newest first.
    pub fn products(inventory_id: Uuid) -> Self {
        Self::listing("product", inventory_id)
    }

    /// `categories:{inventory_id}` - categories of an inventory, by name.
    pub fn categories(inventory_id: Uuid) -> Self {
        CacheKey(format!("categories:{}", inventory_id))
    }

    /// `warehouse:{id}` - a warehouse row without products.
    pub fn warehouse(id: Uuid) -> Self {
        Self::single("warehouse", id)
    }

    /// `warehouses:{inventory_id}` - warehouses of an inventory.
    pub fn warehouses(inventory_id: Uuid) -> Self {
        Self::listing("warehouse", inventory_id)
    }

    /// `inventory:{id}`
    pub fn inventory(id: Uuid) -> Self {
        Self::single("inventory", id)
    }

    /// `inventories:{user_id}`
    pub fn inventories(user_id: Uuid) -> Self {
        CacheKey(format!("inventories:{}", user_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
