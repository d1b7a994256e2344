//! Validation Traits and Catalog Rules
//!
//! Field-level checks shared by the request types, plus the validators that
//! apply catalog rules needing the relational store: product defaults, code
//! generation, and uniqueness within an inventory.
//!
//! Uniqueness checks always query the store directly, never the cache.

use rand::Rng;
use uuid::Uuid;
use venntry_core::{Cents, Product, ProductField, ValidationError, VenntryResult, Warehouse};
use venntry_storage::CatalogStore;

/// Restock level used when a product is saved with 0.
pub const DEFAULT_RESTOCK_LEVEL: i32 = 10;

/// Optimal level used when a product is saved with 0.
pub const DEFAULT_OPTIMAL_LEVEL: i32 = 100;

/// Largest cost or price accepted, in cents (one trillion currency units).
pub const MAX_AMOUNT_CENTS: Cents = 100_000_000_000_000;

const CODE_SUFFIX_LEN: usize = 7;
const CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

// ============================================================================
// FIELD CHECKS
// ============================================================================

/// Trait for validating string lengths in characters.
///
/// # Example
/// ```ignore
/// use venntry_api::validation::ValidateLength;
///
/// req.name.validate_length("name", 1, 100)?;
/// req.brand.validate_max_length("brand", 50)?;
/// ```
pub trait ValidateLength {
    /// Validate that the value has between `min` and `max` characters.
    ///
    /// A `min` of 1 reports an empty value as a missing field.
    fn validate_length(&self, field_name: &str, min: usize, max: usize)
        -> Result<(), ValidationError>;

    /// Validate only the upper bound.
    fn validate_max_length(&self, field_name: &str, max: usize) -> Result<(), ValidationError> {
        self.validate_length(field_name, 0, max)
    }
}

impl ValidateLength for str {
    fn validate_length(
        &self,
        field_name: &str,
        min: usize,
        max: usize,
    ) -> Result<(), ValidationError> {
        let len = self.chars().count();
        if len == 0 && min > 0 {
            return Err(ValidationError::RequiredFieldMissing {
                field: field_name.to_string(),
            });
        }
        if len < min {
            return Err(ValidationError::TooShort {
                field: field_name.to_string(),
                min,
            });
        }
        if len > max {
            return Err(ValidationError::TooLong {
                field: field_name.to_string(),
                max,
            });
        }
        Ok(())
    }
}

impl ValidateLength for String {
    fn validate_length(
        &self,
        field_name: &str,
        min: usize,
        max: usize,
    ) -> Result<(), ValidationError> {
        self.as_str().validate_length(field_name, min, max)
    }
}

/// `None` passes; `Some` is checked like the inner value.
impl<T: ValidateLength> ValidateLength for Option<T> {
    fn validate_length(
        &self,
        field_name: &str,
        min: usize,
        max: usize,
    ) -> Result<(), ValidationError> {
        match self {
            Some(value) => value.validate_length(field_name, min, max),
            None => Ok(()),
        }
    }
}

/// Trait for validating that a number is not negative.
pub trait ValidateNonNegative {
    fn validate_non_negative(&self, field_name: &str) -> Result<(), ValidationError>;
}

macro_rules! impl_validate_non_negative {
    ($($t:ty),*) => {
        $(
            impl ValidateNonNegative for $t {
                fn validate_non_negative(&self, field_name: &str) -> Result<(), ValidationError> {
                    if *self < 0 as $t {
                        return Err(ValidationError::InvalidValue {
                            field: field_name.to_string(),
                            reason: "must not be negative".to_string(),
                        });
                    }
                    Ok(())
                }
            }
        )*
    };
}

impl_validate_non_negative!(i32, i64);

impl ValidateNonNegative for f64 {
    fn validate_non_negative(&self, field_name: &str) -> Result<(), ValidationError> {
        if !self.is_finite() || *self < 0.0 {
            return Err(ValidationError::InvalidValue {
                field: field_name.to_string(),
                reason: "must be a non-negative number".to_string(),
            });
        }
        Ok(())
    }
}

impl<T: ValidateNonNegative> ValidateNonNegative for Option<T> {
    fn validate_non_negative(&self, field_name: &str) -> Result<(), ValidationError> {
        match self {
            Some(value) => value.validate_non_negative(field_name),
            None => Ok(()),
        }
    }
}

// ============================================================================
// PRODUCT RULES
// ============================================================================

/// Build a product code from a name: a short uppercase prefix, a dash, and
/// seven random characters from `0-9A-Z`.
///
/// One word gives its first three letters, padded with `XO` or `X` when
/// shorter. Several words give the initials of the first three.
pub fn generate_product_code(name: &str) -> String {
    let upper = name.to_uppercase();
    let words: Vec<&str> = upper.split_whitespace().collect();

    let prefix: String = match words.as_slice() {
        [] => "XXX".to_string(),
        [word] => match word.chars().count() {
            1 => format!("{}XO", word),
            2 => format!("{}X", word),
            _ => word.chars().take(3).collect(),
        },
        many => many
            .iter()
            .take(3)
            .filter_map(|w| w.chars().next())
            .collect(),
    };

    let mut rng = rand::rng();
    let suffix: String = (0..CODE_SUFFIX_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect();

    format!("{}-{}", prefix, suffix)
}

/// Applies product defaults and checks uniqueness of name, SKU and code
/// within the inventory.
pub struct ProductValidator<'a> {
    store: &'a dyn CatalogStore,
}

impl<'a> ProductValidator<'a> {
    pub fn new(store: &'a dyn CatalogStore) -> Self {
        Self { store }
    }

    /// Fill zero stock levels with the defaults and generate a missing code.
    pub fn apply_defaults(product: &mut Product) {
        if product.restock_level == 0 {
            product.restock_level = DEFAULT_RESTOCK_LEVEL;
        }
        if product.optimal_level == 0 {
            product.optimal_level = DEFAULT_OPTIMAL_LEVEL;
        }
        if product.code.is_none() {
            product.code = Some(generate_product_code(&product.name));
        }
    }

    /// Reject cost or price above [`MAX_AMOUNT_CENTS`].
    pub fn check_amounts(product: &Product) -> Result<(), ValidationError> {
        for (field, amount) in [("cost", product.cost), ("price", product.price)] {
            if amount > MAX_AMOUNT_CENTS {
                return Err(ValidationError::InvalidValue {
                    field: field.to_string(),
                    reason: "exceeds the maximum amount".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Apply defaults, then reject oversized amounts and duplicates.
    /// `exclude_id` is the product being updated.
    ///
    /// Every duplicate is reported in one error, messages joined with "; ".
    pub async fn validate(&self, product: &mut Product, exclude_id: Option<Uuid>) -> VenntryResult<()> {
        Self::apply_defaults(product);
        Self::check_amounts(product)?;

        let mut checks = vec![
            (ProductField::Name, product.name.as_str()),
            (ProductField::Sku, product.sku.as_str()),
        ];
        if let Some(code) = product.code.as_deref() {
            checks.push((ProductField::Code, code));
        }

        let mut duplicates = Vec::new();
        for (field, value) in checks {
            if self
                .store
                .product_field_exists(field, value, product.inventory_id, exclude_id)
                .await?
            {
                duplicates.push(format!("Product {} already exists", field.label()));
            }
        }

        if !duplicates.is_empty() {
            tracing::debug!(
                inventory_id = %product.inventory_id,
                duplicates = duplicates.len(),
                "product rejected as duplicate"
            );
            return Err(ValidationError::Duplicate(duplicates.join("; ")).into());
        }
        Ok(())
    }
}

// ============================================================================
// WAREHOUSE RULES
// ============================================================================

/// Checks warehouse name uniqueness within the inventory.
pub struct WarehouseValidator<'a> {
    store: &'a dyn CatalogStore,
}

impl<'a> WarehouseValidator<'a> {
    pub fn new(store: &'a dyn CatalogStore) -> Self {
        Self { store }
    }

    pub async fn validate(&self, warehouse: &Warehouse, exclude_id: Option<Uuid>) -> VenntryResult<()> {
        if self
            .store
            .warehouse_name_exists(&warehouse.name, warehouse.inventory_id, exclude_id)
            .await?
        {
            return Err(ValidationError::Duplicate(
                "Warehouse name already exists".to_string(),
            )
            .into());
        }
        Ok(())
    }
}
