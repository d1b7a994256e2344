//! Warehouse REST API Routes

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use venntry_core::{now, Warehouse};

use crate::cached_db::CachedCatalog;
use crate::error::ApiResult;
use crate::extractors::WarehouseId;
use crate::state::AppState;
use crate::types::WarehouseRequest;
use crate::validation::WarehouseValidator;

/// GET /api/warehouses/:warehouse_id - Warehouse with its stocked products
pub async fn get_warehouse(
    State(catalog): State<CachedCatalog>,
    WarehouseId(id): WarehouseId,
) -> ApiResult<Json<Warehouse>> {
    Ok(Json(catalog.warehouse_get_with_products(id).await?))
}

/// PUT /api/warehouses/:warehouse_id
pub async fn update_warehouse(
    State(catalog): State<CachedCatalog>,
    WarehouseId(id): WarehouseId,
    Json(req): Json<WarehouseRequest>,
) -> ApiResult<Json<Warehouse>> {
    let req = req.sanitize();
    req.validate()?;

    let existing = catalog.warehouse_get(id).await?;
    let warehouse = req.apply_to(existing, now());
    WarehouseValidator::new(catalog.store())
        .validate(&warehouse, Some(id))
        .await?;

    Ok(Json(catalog.warehouse_update(warehouse).await?))
}

/// DELETE /api/warehouses/:warehouse_id
pub async fn delete_warehouse(
    State(catalog): State<CachedCatalog>,
    WarehouseId(id): WarehouseId,
) -> ApiResult<StatusCode> {
    catalog.warehouse_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn create_router() -> Router<AppState> {
    Router::new().route(
        "/:warehouse_id",
        get(get_warehouse)
            .put(update_warehouse)
            .delete(delete_warehouse),
    )
}
