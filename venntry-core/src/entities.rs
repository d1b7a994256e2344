//! Core entity structures
//!
//! These are the aggregates that flow through the relational store and the
//! cache. The JSON shape (camelCase, RFC 3339 timestamps) is the cache
//! payload format as well as the HTTP body format, so every field must
//! survive a serialize/deserialize round-trip unchanged.

use crate::{Cents, EntityId, Timestamp};
use serde::{Deserialize, Serialize};

/// Product - a stock-keeping unit inside an inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: EntityId,
    pub name: String,
    pub sku: String,
    pub code: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub description: Option<String>,
    pub quantity: i32,
    pub restock_level: i32,
    pub optimal_level: i32,
    /// Unit cost in cents.
    pub cost: Cents,
    /// Unit price in cents.
    pub price: Cents,
    pub inventory_id: EntityId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub warehouses: Vec<Warehouse>,
}

impl Product {
    /// Copy of this product without any relation collections.
    pub fn without_relations(&self) -> Product {
        Product {
            images: Vec::new(),
            categories: Vec::new(),
            warehouses: Vec::new(),
            ..self.clone()
        }
    }
}

/// Product image. Only the URL and storage key are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: EntityId,
    pub url: String,
    pub file_key: String,
    pub product_id: EntityId,
    pub is_primary: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: EntityId,
    pub name: String,
    pub inventory_id: EntityId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Warehouse - a physical stock location belonging to an inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    pub id: EntityId,
    pub name: String,
    pub location: Option<String>,
    pub capacity: Option<i32>,
    pub inventory_id: EntityId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default)]
    pub products: Vec<Product>,
}

/// Inventory - the top-level catalog container owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub id: EntityId,
    pub name: String,
    pub user_id: EntityId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Registered account.
///
/// The password field holds the Argon2 PHC string and is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: EntityId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub role: String,
    pub avatar: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Image payload attached to a product write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInput {
    pub url: String,
    pub file_key: String,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{new_entity_id, now};

    fn sample_product() -> Product {
        let ts = now();
        let id = new_entity_id();
        let inventory_id = new_entity_id();
        Product {
            id,
            name: "Widget".to_string(),
            sku: "W-1".to_string(),
            code: Some("WID-ABC1234".to_string()),
            brand: None,
            model: Some("M1".to_string()),
            description: None,
            quantity: 5,
            restock_level: 10,
            optimal_level: 100,
            cost: 1250,
            price: 1999,
            inventory_id,
            created_at: ts,
            updated_at: ts,
            images: vec![Image {
                id: new_entity_id(),
                url: "https://cdn.example.com/w.png".to_string(),
                file_key: "w.png".to_string(),
                product_id: id,
                is_primary: true,
                created_at: ts,
                updated_at: ts,
            }],
            categories: vec![Category {
                id: new_entity_id(),
                name: "Tools".to_string(),
                inventory_id,
                created_at: ts,
                updated_at: ts,
            }],
            warehouses: Vec::new(),
        }
    }

    #[test]
    fn test_product_serializes_camel_case() {
        let json = serde_json::to_value(sample_product()).unwrap();
        assert!(json.get("restockLevel").is_some());
        assert!(json.get("inventoryId").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json["images"][0].get("isPrimary").is_some());
    }

    #[test]
    fn test_product_round_trip() {
        let product = sample_product();
        let bytes = serde_json::to_vec(&product).unwrap();
        let back: Product = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(product, back);
    }

    #[test]
    fn test_missing_relations_default_to_empty() {
        let mut json = serde_json::to_value(sample_product()).unwrap();
        let obj = json.as_object_mut().unwrap();
        obj.remove("images");
        obj.remove("categories");
        obj.remove("warehouses");
        let back: Product = serde_json::from_value(json).unwrap();
        assert!(back.images.is_empty());
        assert!(back.categories.is_empty());
        assert!(back.warehouses.is_empty());
    }

    #[test]
    fn test_without_relations_keeps_row_fields() {
        let product = sample_product();
        let bare = product.without_relations();
        assert_eq!(bare.id, product.id);
        assert_eq!(bare.price, product.price);
        assert!(bare.images.is_empty());
        assert!(bare.categories.is_empty());
    }

    #[test]
    fn test_user_password_never_serialized() {
        let ts = now();
        let user = User {
            id: new_entity_id(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "$argon2id$secret".to_string(),
            role: "user".to_string(),
            avatar: None,
            created_at: ts,
            updated_at: ts,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
    }
}
