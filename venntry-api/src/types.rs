//! API Request and Response Types
//!
//! Request bodies are sanitized (trimmed, blank optionals dropped, relation
//! lists deduplicated) before field validation, and only then turned into
//! catalog entities. Money arrives as decimal currency and is stored in
//! cents.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use venntry_core::{
    Cents, EntityId, ImageInput, Inventory, Product, Timestamp, User, ValidationError, Warehouse,
};
use venntry_storage::ProductWrite;

use crate::validation::{ValidateLength, ValidateNonNegative};

/// Convert a decimal currency amount to integer cents.
pub fn to_cents(amount: f64) -> Cents {
    (amount * 100.0).round() as Cents
}

fn trim_optional(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Keep the first occurrence of every value, in order.
fn dedupe(values: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

// ============================================================================
// PRODUCT TYPES
// ============================================================================

/// Body of a product create or full update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    pub name: String,
    pub sku: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: i32,
    /// 0 or absent means the default restock level
    #[serde(default)]
    pub restock_level: i32,
    /// 0 or absent means the default optimal level
    #[serde(default)]
    pub optimal_level: i32,
    /// Unit cost in currency units
    #[serde(default)]
    pub cost: f64,
    /// Unit price in currency units
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub images: Vec<ImageInput>,
    /// Category names; missing ones are created
    #[serde(default)]
    pub categories: Vec<String>,
    /// Warehouse ids as strings so a bad id is reported by name
    #[serde(default)]
    pub warehouses: Vec<String>,
}

impl ProductRequest {
    pub fn sanitize(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            sku: self.sku.trim().to_string(),
            code: trim_optional(self.code),
            brand: trim_optional(self.brand),
            model: trim_optional(self.model),
            description: trim_optional(self.description),
            images: self
                .images
                .into_iter()
                .map(|img| ImageInput {
                    url: img.url.trim().to_string(),
                    file_key: img.file_key.trim().to_string(),
                })
                .collect(),
            categories: dedupe(
                self.categories
                    .into_iter()
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect(),
            ),
            warehouses: dedupe(
                self.warehouses
                    .into_iter()
                    .map(|w| w.trim().to_string())
                    .collect(),
            ),
            ..self
        }
    }

    /// Field rules. Call after [`sanitize`](Self::sanitize).
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.name.validate_length("name", 1, 100)?;
        self.sku.validate_length("sku", 1, 50)?;
        self.code.validate_max_length("code", 50)?;
        self.brand.validate_max_length("brand", 50)?;
        self.model.validate_max_length("model", 50)?;
        self.description.validate_max_length("description", 200)?;
        self.quantity.validate_non_negative("quantity")?;
        self.restock_level.validate_non_negative("restockLevel")?;
        self.optimal_level.validate_non_negative("optimalLevel")?;
        self.cost.validate_non_negative("cost")?;
        self.price.validate_non_negative("price")?;
        for category in &self.categories {
            category.validate_length("categories", 1, 50)?;
        }
        for image in &self.images {
            image.url.validate_length("images.url", 1, 2048)?;
            image.file_key.validate_length("images.fileKey", 1, 255)?;
        }
        self.warehouse_ids()?;
        Ok(())
    }

    pub fn warehouse_ids(&self) -> Result<Vec<Uuid>, ValidationError> {
        self.warehouses
            .iter()
            .map(|raw| {
                Uuid::parse_str(raw)
                    .map_err(|_| ValidationError::Invalid("Invalid warehouse ID".to_string()))
            })
            .collect()
    }

    /// Build the product row and relation payload.
    pub fn into_write(
        self,
        id: EntityId,
        inventory_id: EntityId,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Result<ProductWrite, ValidationError> {
        let warehouse_ids = self.warehouse_ids()?;
        let product = Product {
            id,
            name: self.name,
            sku: self.sku,
            code: self.code,
            brand: self.brand,
            model: self.model,
            description: self.description,
            quantity: self.quantity,
            restock_level: self.restock_level,
            optimal_level: self.optimal_level,
            cost: to_cents(self.cost),
            price: to_cents(self.price),
            inventory_id,
            created_at,
            updated_at,
            images: Vec::new(),
            categories: Vec::new(),
            warehouses: Vec::new(),
        };
        Ok(ProductWrite {
            product,
            images: self.images,
            category_names: self.categories,
            warehouse_ids,
        })
    }
}

/// Body of a stock update for one product in one warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockUpdateRequest {
    pub quantity: i32,
}

// ============================================================================
// WAREHOUSE TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseRequest {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub capacity: Option<i32>,
}

impl WarehouseRequest {
    pub fn sanitize(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            location: trim_optional(self.location),
            capacity: self.capacity,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.name.validate_length("name", 1, 50)?;
        self.location.validate_max_length("location", 200)?;
        self.capacity.validate_non_negative("capacity")?;
        Ok(())
    }

    /// Apply this request on top of a warehouse row.
    pub fn apply_to(self, mut warehouse: Warehouse, updated_at: Timestamp) -> Warehouse {
        warehouse.name = self.name;
        warehouse.location = self.location;
        warehouse.capacity = self.capacity;
        warehouse.updated_at = updated_at;
        warehouse.products = Vec::new();
        warehouse
    }
}

// ============================================================================
// INVENTORY TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRequest {
    pub name: String,
}

impl InventoryRequest {
    pub fn sanitize(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.name.validate_length("name", 1, 100)
    }
}

// ============================================================================
// ACCOUNT TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    /// Trim and lowercase username and email. The password is left as is.
    pub fn sanitize(self) -> Self {
        Self {
            username: self.username.trim().to_lowercase(),
            email: self.email.trim().to_lowercase(),
            password: self.password,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.username.validate_length("username", 3, 50)?;
        self.email.validate_length("email", 1, 255)?;
        if !is_valid_email(&self.email) {
            return Err(ValidationError::InvalidValue {
                field: "email".to_string(),
                reason: "must be a valid email address".to_string(),
            });
        }
        self.password.validate_length("password", 6, 255)?;
        Ok(())
    }
}

fn is_valid_email(email: &str) -> bool {
    use once_cell::sync::Lazy;
    use regex::Regex;

    static EMAIL: Lazy<Option<Regex>> =
        Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

    EMAIL.as_ref().is_some_and(|re| re.is_match(email))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful login payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_id: EntityId,
    pub user_name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub token: String,
    pub inventories: Vec<Inventory>,
}

impl LoginResponse {
    pub fn new(user: User, token: String, inventories: Vec<Inventory>) -> Self {
        Self {
            user_id: user.id,
            user_name: user.username,
            email: user.email,
            avatar: user.avatar,
            token,
            inventories,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckTokenResponse {
    pub expired: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use venntry_core::{new_entity_id, now};

    fn request() -> ProductRequest {
        serde_json::from_value(serde_json::json!({
            "name": "  Widget ",
            "sku": "W-1",
            "brand": "   ",
            "quantity": 5,
            "cost": 12.34,
            "price": 19.99,
            "categories": ["Tools", " Tools", "", "Hardware"],
            "warehouses": []
        }))
        .unwrap()
    }

    #[test]
    fn test_to_cents_rounds() {
        assert_eq!(to_cents(19.99), 1999);
        assert_eq!(to_cents(12.34), 1234);
        assert_eq!(to_cents(0.125), 13);
        assert_eq!(to_cents(0.0), 0);
        assert_eq!(to_cents(0.1 + 0.2), 30);
    }

    #[test]
    fn test_sanitize_product() {
        let req = request().sanitize();
        assert_eq!(req.name, "Widget");
        assert_eq!(req.brand, None);
        assert_eq!(req.categories, vec!["Tools", "Hardware"]);
        assert_eq!(req.restock_level, 0);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_bad_warehouse_id() {
        let mut req = request().sanitize();
        req.warehouses = vec!["not-a-uuid".into()];
        assert_eq!(
            req.validate(),
            Err(ValidationError::Invalid("Invalid warehouse ID".into()))
        );
    }

    #[test]
    fn test_duplicate_warehouses_removed() {
        let id = new_entity_id().to_string();
        let mut req = request();
        req.warehouses = vec![id.clone(), format!(" {id} ")];
        let req = req.sanitize();
        assert_eq!(req.warehouse_ids().unwrap().len(), 1);
    }

    #[test]
    fn test_negative_price_rejected() {
        let mut req = request().sanitize();
        req.price = -1.0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_into_write_converts_money() {
        let inventory_id = new_entity_id();
        let ts = now();
        let write = request()
            .sanitize()
            .into_write(new_entity_id(), inventory_id, ts, ts)
            .unwrap();
        assert_eq!(write.product.cost, 1234);
        assert_eq!(write.product.price, 1999);
        assert_eq!(write.product.inventory_id, inventory_id);
        assert_eq!(write.category_names.len(), 2);
    }

    #[test]
    fn test_register_sanitize_and_validate() {
        let req = RegisterRequest {
            username: "  Alice ".into(),
            email: " Alice@Example.COM ".into(),
            password: "secret1".into(),
        }
        .sanitize();
        assert_eq!(req.username, "alice");
        assert_eq!(req.email, "alice@example.com");
        assert!(req.validate().is_ok());

        let short = RegisterRequest {
            password: "12345".into(),
            ..req.clone()
        };
        assert!(short.validate().is_err());

        let bad_email = RegisterRequest {
            email: "alice.example.com".into(),
            ..req
        };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_warehouse_request_apply() {
        let existing = Warehouse {
            id: new_entity_id(),
            name: "Old".into(),
            location: None,
            capacity: None,
            inventory_id: new_entity_id(),
            created_at: now(),
            updated_at: now(),
            products: Vec::new(),
        };
        let req = WarehouseRequest {
            name: " New ".into(),
            location: Some("".into()),
            capacity: Some(10),
        }
        .sanitize();
        assert!(req.validate().is_ok());
        let updated = req.apply_to(existing.clone(), now());
        assert_eq!(updated.id, existing.id);
        assert_eq!(updated.name, "New");
        assert_eq!(updated.location, None);
        assert_eq!(updated.capacity, Some(10));
    }

    #[test]
    fn test_login_response_shape() {
        let ts = now();
        let user = User {
            id: new_entity_id(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "hash".into(),
            role: "user".into(),
            avatar: None,
            created_at: ts,
            updated_at: ts,
        };
        let json = serde_json::to_value(LoginResponse::new(user, "tok".into(), Vec::new())).unwrap();
        assert_eq!(json["userName"], "alice");
        assert_eq!(json["token"], "tok");
        assert!(json.get("password").is_none());
    }
}
