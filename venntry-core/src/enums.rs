//! Enum types for catalog entities

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Product,
    Warehouse,
    Category,
    Inventory,
    Image,
    User,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Product => "product",
            EntityType::Warehouse => "warehouse",
            EntityType::Category => "category",
            EntityType::Inventory => "inventory",
            EntityType::Image => "image",
            EntityType::User => "user",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product columns that must be unique within an inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductField {
    Name,
    Sku,
    Code,
}

impl ProductField {
    /// Column name in the `products` table.
    pub fn column(&self) -> &'static str {
        match self {
            ProductField::Name => "name",
            ProductField::Sku => "sku",
            ProductField::Code => "code",
        }
    }

    /// Human-facing label used in duplicate messages.
    pub fn label(&self) -> &'static str {
        match self {
            ProductField::Name => "name",
            ProductField::Sku => "SKU",
            ProductField::Code => "code",
        }
    }
}
