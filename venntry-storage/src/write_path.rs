//! Transactional product writes.
//!
//! A product and its relation rows are written inside one transaction in a
//! fixed order: product row, images, categories (find-or-create, then link),
//! warehouse links. Updates clear every existing relation row first and
//! re-insert from the request. Any failure rolls the transaction back and
//! the original error is returned; the cache is never touched here.

use uuid::Uuid;
use venntry_core::{
    new_entity_id, Category, EntityType, Image, ImageInput, Product, StorageError, StorageResult,
};

use crate::store::{CatalogStore, CatalogTransaction};

/// Product row plus the relation payload of a create or update request.
#[derive(Debug, Clone)]
pub struct ProductWrite {
    /// Row fields. Relation collections on this value are ignored.
    pub product: Product,
    /// Images in request order; the first one becomes primary.
    pub images: Vec<ImageInput>,
    /// Category names, created in the inventory when missing.
    pub category_names: Vec<String>,
    pub warehouse_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Create,
    Update,
}

/// Insert a product with its images, categories and warehouse links.
///
/// Returns the product as written, with images and categories attached.
pub async fn create_product(store: &dyn CatalogStore, write: ProductWrite) -> StorageResult<Product> {
    run(store, &write, WriteMode::Create).await
}

/// Replace a product row and all of its relation rows.
///
/// NotFound when no row matches the product id.
pub async fn update_product(store: &dyn CatalogStore, write: ProductWrite) -> StorageResult<Product> {
    run(store, &write, WriteMode::Update).await
}

async fn run(store: &dyn CatalogStore, write: &ProductWrite, mode: WriteMode) -> StorageResult<Product> {
    let mut tx = store.begin().await?;
    match apply(tx.as_mut(), write, mode).await {
        Ok(product) => {
            tx.commit().await?;
            tracing::debug!(
                product_id = %product.id,
                images = product.images.len(),
                categories = product.categories.len(),
                warehouses = write.warehouse_ids.len(),
                "product write committed"
            );
            Ok(product)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(
                    product_id = %write.product.id,
                    error = %rollback_err,
                    "rollback failed"
                );
            }
            Err(e)
        }
    }
}

async fn apply(
    tx: &mut dyn CatalogTransaction,
    write: &ProductWrite,
    mode: WriteMode,
) -> StorageResult<Product> {
    let mut product = write.product.without_relations();

    match mode {
        WriteMode::Create => tx.insert_product(&product).await?,
        WriteMode::Update => {
            if tx.update_product(&product).await? == 0 {
                return Err(StorageError::NotFound {
                    entity_type: EntityType::Product,
                    id: product.id,
                });
            }
            tx.clear_product_relations(product.id).await?;
        }
    }

    let ts = product.updated_at;

    for (i, input) in write.images.iter().enumerate() {
        let image = Image {
            id: new_entity_id(),
            url: input.url.clone(),
            file_key: input.file_key.clone(),
            product_id: product.id,
            is_primary: i == 0,
            created_at: ts,
            updated_at: ts,
        };
        tx.insert_image(&image).await?;
        product.images.push(image);
    }

    for name in &write.category_names {
        let category = match tx.find_category(name, product.inventory_id).await? {
            Some(existing) => existing,
            None => {
                let created = Category {
                    id: new_entity_id(),
                    name: name.clone(),
                    inventory_id: product.inventory_id,
                    created_at: ts,
                    updated_at: ts,
                };
                tx.insert_category(&created).await?;
                created
            }
        };
        tx.link_category(product.id, category.id).await?;
        product.categories.push(category);
    }

    for warehouse_id in &write.warehouse_ids {
        tx.link_warehouse(product.id, *warehouse_id).await?;
    }

    Ok(product)
}
