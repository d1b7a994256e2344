//! Path extractors for entity IDs.
//!
//! Each extractor reads one named path parameter and parses it as a UUID.
//! A missing or malformed value is rejected with 400 and a message naming
//! the entity, e.g. `Invalid product ID`.

use std::collections::HashMap;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use uuid::Uuid;

use crate::error::ApiError;

fn parse_path_id(params: &HashMap<String, String>, param: &str, entity: &str) -> Result<Uuid, ApiError> {
    params
        .get(param)
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| ApiError::invalid_input(format!("Invalid {} ID", entity)))
}

macro_rules! path_id_extractor {
    ($(#[$meta:meta])* $name:ident, $param:literal, $entity:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name(pub Uuid);

        #[async_trait]
        impl<S> FromRequestParts<S> for $name
        where
            S: Send + Sync,
        {
            type Rejection = ApiError;

            async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
                let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
                    .await
                    .map_err(|_| ApiError::invalid_input(concat!("Invalid ", $entity, " ID")))?;
                parse_path_id(&params, $param, $entity).map($name)
            }
        }
    };
}

path_id_extractor!(
    /// `:product_id` path parameter.
    ProductId,
    "product_id",
    "product"
);
path_id_extractor!(
    /// `:warehouse_id` path parameter.
    WarehouseId,
    "warehouse_id",
    "warehouse"
);
path_id_extractor!(
    /// `:inventory_id` path parameter.
    InventoryId,
    "inventory_id",
    "inventory"
);
