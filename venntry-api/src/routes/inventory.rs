//! Inventory REST API Routes
//!
//! Inventories belong to the authenticated user. Products, categories and
//! warehouses are listed and created under their inventory.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use venntry_core::{new_entity_id, now, Category, Inventory, Product, Warehouse};

use crate::cached_db::CachedCatalog;
use crate::error::ApiResult;
use crate::extractors::InventoryId;
use crate::middleware::AuthExtractor;
use crate::state::AppState;
use crate::types::{InventoryRequest, ProductRequest, WarehouseRequest};
use crate::validation::{ProductValidator, WarehouseValidator};

// ============================================================================
// INVENTORY HANDLERS
// ============================================================================

/// GET /api/inventories - Inventories of the caller
pub async fn list_inventories(
    State(catalog): State<CachedCatalog>,
    auth: AuthExtractor,
) -> ApiResult<Json<Vec<Inventory>>> {
    let inventories = catalog.inventory_list(auth.user_id()).await?;
    Ok(Json(inventories))
}

/// POST /api/inventories - Create an inventory for the caller
pub async fn create_inventory(
    State(catalog): State<CachedCatalog>,
    auth: AuthExtractor,
    Json(req): Json<InventoryRequest>,
) -> ApiResult<impl IntoResponse> {
    let req = req.sanitize();
    req.validate()?;

    let ts = now();
    let inventory = Inventory {
        id: new_entity_id(),
        name: req.name,
        user_id: auth.user_id(),
        created_at: ts,
        updated_at: ts,
    };
    let inventory = catalog.inventory_create(inventory).await?;
    Ok((StatusCode::CREATED, Json(inventory)))
}

/// GET /api/inventories/:inventory_id
pub async fn get_inventory(
    State(catalog): State<CachedCatalog>,
    InventoryId(id): InventoryId,
) -> ApiResult<Json<Inventory>> {
    Ok(Json(catalog.inventory_get(id).await?))
}

/// PUT /api/inventories/:inventory_id - Rename an inventory
pub async fn update_inventory(
    State(catalog): State<CachedCatalog>,
    InventoryId(id): InventoryId,
    Json(req): Json<InventoryRequest>,
) -> ApiResult<Json<Inventory>> {
    let req = req.sanitize();
    req.validate()?;

    let mut inventory = catalog.inventory_get(id).await?;
    inventory.name = req.name;
    inventory.updated_at = now();

    Ok(Json(catalog.inventory_update(inventory).await?))
}

/// DELETE /api/inventories/:inventory_id - Delete an inventory and everything in it
pub async fn delete_inventory(
    State(catalog): State<CachedCatalog>,
    InventoryId(id): InventoryId,
) -> ApiResult<StatusCode> {
    catalog.inventory_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// NESTED COLLECTION HANDLERS
// ============================================================================

/// GET /api/inventories/:inventory_id/products
pub async fn list_products(
    State(catalog): State<CachedCatalog>,
    InventoryId(inventory_id): InventoryId,
) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(catalog.product_list(inventory_id).await?))
}

/// POST /api/inventories/:inventory_id/products - Create a product with its relations
pub async fn create_product(
    State(catalog): State<CachedCatalog>,
    InventoryId(inventory_id): InventoryId,
    Json(req): Json<ProductRequest>,
) -> ApiResult<impl IntoResponse> {
    catalog.store().inventory_get(inventory_id).await?;

    let req = req.sanitize();
    req.validate()?;

    let ts = now();
    let mut write = req.into_write(new_entity_id(), inventory_id, ts, ts)?;
    ProductValidator::new(catalog.store())
        .validate(&mut write.product, None)
        .await?;

    let product = catalog.product_create(write).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /api/inventories/:inventory_id/categories
pub async fn list_categories(
    State(catalog): State<CachedCatalog>,
    InventoryId(inventory_id): InventoryId,
) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(catalog.category_list(inventory_id).await?))
}

/// GET /api/inventories/:inventory_id/warehouses
pub async fn list_warehouses(
    State(catalog): State<CachedCatalog>,
    InventoryId(inventory_id): InventoryId,
) -> ApiResult<Json<Vec<Warehouse>>> {
    Ok(Json(catalog.warehouse_list(inventory_id).await?))
}

/// POST /api/inventories/:inventory_id/warehouses
pub async fn create_warehouse(
    State(catalog): State<CachedCatalog>,
    InventoryId(inventory_id): InventoryId,
    Json(req): Json<WarehouseRequest>,
) -> ApiResult<impl IntoResponse> {
    catalog.store().inventory_get(inventory_id).await?;

    let req = req.sanitize();
    req.validate()?;

    let ts = now();
    let warehouse = Warehouse {
        id: new_entity_id(),
        name: req.name,
        location: req.location,
        capacity: req.capacity,
        inventory_id,
        created_at: ts,
        updated_at: ts,
        products: Vec::new(),
    };
    WarehouseValidator::new(catalog.store())
        .validate(&warehouse, None)
        .await?;

    let warehouse = catalog.warehouse_create(warehouse).await?;
    Ok((StatusCode::CREATED, Json(warehouse)))
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_inventories).post(create_inventory))
        .route(
            "/:inventory_id",
            get(get_inventory).put(update_inventory).delete(delete_inventory),
        )
        .route(
            "/:inventory_id/products",
            get(list_products).post(create_product),
        )
        .route("/:inventory_id/categories", get(list_categories))
        .route(
            "/:inventory_id/warehouses",
            get(list_warehouses).post(create_warehouse),
        )
}
