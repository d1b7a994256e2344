//! Product REST API Routes

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use venntry_core::{now, Product};

use crate::cached_db::CachedCatalog;
use crate::error::ApiResult;
use crate::extractors::{ProductId, WarehouseId};
use crate::state::AppState;
use crate::types::{ProductRequest, StockUpdateRequest};
use crate::validation::{ProductValidator, ValidateNonNegative};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/products/:product_id - Product with images, categories and warehouses
pub async fn get_product(
    State(catalog): State<CachedCatalog>,
    ProductId(id): ProductId,
) -> ApiResult<Json<Product>> {
    Ok(Json(catalog.product_get_with_relations(id).await?))
}

/// PUT /api/products/:product_id - Replace a product and its relations
///
/// The inventory and creation time of the stored product are kept. A request
/// without a code keeps the stored code.
pub async fn update_product(
    State(catalog): State<CachedCatalog>,
    ProductId(id): ProductId,
    Json(req): Json<ProductRequest>,
) -> ApiResult<Json<Product>> {
    let existing = catalog.product_get(id).await?;

    let req = req.sanitize();
    req.validate()?;

    let mut write = req.into_write(id, existing.inventory_id, existing.created_at, now())?;
    if write.product.code.is_none() {
        write.product.code = existing.code;
    }
    ProductValidator::new(catalog.store())
        .validate(&mut write.product, Some(id))
        .await?;

    Ok(Json(catalog.product_update(write).await?))
}

/// DELETE /api/products/:product_id
pub async fn delete_product(
    State(catalog): State<CachedCatalog>,
    ProductId(id): ProductId,
) -> ApiResult<StatusCode> {
    catalog.product_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/products/:product_id/warehouses/:warehouse_id - Set stock in one warehouse
pub async fn update_stock(
    State(catalog): State<CachedCatalog>,
    ProductId(product_id): ProductId,
    WarehouseId(warehouse_id): WarehouseId,
    Json(req): Json<StockUpdateRequest>,
) -> ApiResult<StatusCode> {
    req.quantity.validate_non_negative("quantity")?;
    catalog
        .product_stock_update(product_id, warehouse_id, req.quantity)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(
            "/:product_id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route(
            "/:product_id/warehouses/:warehouse_id",
            patch(update_stock),
        )
}
