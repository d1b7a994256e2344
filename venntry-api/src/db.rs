//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling with deadpool-postgres and the
//! [`CatalogStore`] implementation used in production. Failures are returned
//! as [`StorageError::Database`] carrying the raw SQLSTATE and server message;
//! classification happens in the API error layer.
//!
//! The expected schema lives in `sql/schema.sql`.

use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Object, Pool, RecyclingMethod, Runtime};
use std::time::Duration;
use tokio_postgres::{NoTls, Row};
use uuid::Uuid;
use venntry_core::{
    Category, EntityType, Image, Inventory, Product, ProductField, StorageError, StorageResult,
    User, Warehouse,
};
use venntry_storage::{CatalogStore, CatalogTransaction};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full connection URL; overrides the individual fields when set
    pub url: Option<String>,
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Connection timeout
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            dbname: "venntry".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            host: std::env::var("VENNTRY_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("VENNTRY_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("VENNTRY_DB_NAME").unwrap_or_else(|_| "venntry".to_string()),
            user: std::env::var("VENNTRY_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("VENNTRY_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("VENNTRY_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("VENNTRY_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        match &self.url {
            Some(url) => cfg.url = Some(url.clone()),
            None => {
                cfg.host = Some(self.host.clone());
                cfg.port = Some(self.port);
                cfg.dbname = Some(self.dbname.clone());
                cfg.user = Some(self.user.clone());
                cfg.password = Some(self.password.clone());
            }
        }

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        pool_cfg.timeouts.create = Some(self.timeout);
        pool_cfg.timeouts.recycle = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// ERROR MAPPING
// ============================================================================

/// Keep SQLSTATE and the server message of a driver error.
fn pg_error(operation: &'static str) -> impl Fn(tokio_postgres::Error) -> StorageError {
    move |err| {
        let sqlstate = err.code().map(|c| c.code().to_string());
        let message = err
            .as_db_error()
            .map(|db| db.message().to_string())
            .unwrap_or_else(|| err.to_string());
        StorageError::database(operation, sqlstate, message)
    }
}

fn pool_error(err: deadpool_postgres::PoolError) -> StorageError {
    StorageError::Pool {
        reason: err.to_string(),
    }
}

fn not_found(entity_type: EntityType, id: Uuid) -> StorageError {
    StorageError::NotFound { entity_type, id }
}

// ============================================================================
// ROW MAPPING
// ============================================================================

const PRODUCT_COLUMNS: &str = "id, name, sku, code, brand, model, description, quantity, \
     restock_level, optimal_level, cost, price, inventory_id, created_at, updated_at";

const PRODUCT_COLUMNS_P: &str = "p.id, p.name, p.sku, p.code, p.brand, p.model, p.description, \
     p.quantity, p.restock_level, p.optimal_level, p.cost, p.price, p.inventory_id, \
     p.created_at, p.updated_at";

const WAREHOUSE_COLUMNS: &str =
    "id, name, location, capacity, inventory_id, created_at, updated_at";

const WAREHOUSE_COLUMNS_W: &str =
    "w.id, w.name, w.location, w.capacity, w.inventory_id, w.created_at, w.updated_at";

const CATEGORY_COLUMNS_C: &str = "c.id, c.name, c.inventory_id, c.created_at, c.updated_at";

const USER_COLUMNS: &str =
    "id, username, email, password, role, avatar, created_at, updated_at";

fn product_from_row(row: &Row) -> Result<Product, tokio_postgres::Error> {
    Ok(Product {
        id: row.try_get(0)?,
        name: row.try_get(1)?,
        sku: row.try_get(2)?,
        code: row.try_get(3)?,
        brand: row.try_get(4)?,
        model: row.try_get(5)?,
        description: row.try_get(6)?,
        quantity: row.try_get(7)?,
        restock_level: row.try_get(8)?,
        optimal_level: row.try_get(9)?,
        cost: row.try_get(10)?,
        price: row.try_get(11)?,
        inventory_id: row.try_get(12)?,
        created_at: row.try_get(13)?,
        updated_at: row.try_get(14)?,
        images: Vec::new(),
        categories: Vec::new(),
        warehouses: Vec::new(),
    })
}

fn warehouse_from_row(row: &Row) -> Result<Warehouse, tokio_postgres::Error> {
    Ok(Warehouse {
        id: row.try_get(0)?,
        name: row.try_get(1)?,
        location: row.try_get(2)?,
        capacity: row.try_get(3)?,
        inventory_id: row.try_get(4)?,
        created_at: row.try_get(5)?,
        updated_at: row.try_get(6)?,
        products: Vec::new(),
    })
}

fn category_from_row(row: &Row) -> Result<Category, tokio_postgres::Error> {
    Ok(Category {
        id: row.try_get(0)?,
        name: row.try_get(1)?,
        inventory_id: row.try_get(2)?,
        created_at: row.try_get(3)?,
        updated_at: row.try_get(4)?,
    })
}

fn image_from_row(row: &Row) -> Result<Image, tokio_postgres::Error> {
    Ok(Image {
        id: row.try_get(0)?,
        url: row.try_get(1)?,
        file_key: row.try_get(2)?,
        product_id: row.try_get(3)?,
        is_primary: row.try_get(4)?,
        created_at: row.try_get(5)?,
        updated_at: row.try_get(6)?,
    })
}

fn inventory_from_row(row: &Row) -> Result<Inventory, tokio_postgres::Error> {
    Ok(Inventory {
        id: row.try_get(0)?,
        name: row.try_get(1)?,
        user_id: row.try_get(2)?,
        created_at: row.try_get(3)?,
        updated_at: row.try_get(4)?,
    })
}

fn user_from_row(row: &Row) -> Result<User, tokio_postgres::Error> {
    Ok(User {
        id: row.try_get(0)?,
        username: row.try_get(1)?,
        email: row.try_get(2)?,
        password: row.try_get(3)?,
        role: row.try_get(4)?,
        avatar: row.try_get(5)?,
        created_at: row.try_get(6)?,
        updated_at: row.try_get(7)?,
    })
}

fn map_rows<T>(
    rows: Vec<Row>,
    f: fn(&Row) -> Result<T, tokio_postgres::Error>,
    operation: &'static str,
) -> StorageResult<Vec<T>> {
    rows.iter()
        .map(|row| f(row).map_err(pg_error(operation)))
        .collect()
}

// ============================================================================
// DATABASE CLIENT WRAPPER
// ============================================================================

/// Database client that wraps a connection pool.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    /// Create a new database client with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Get a connection from the pool.
    async fn get_conn(&self) -> StorageResult<Object> {
        self.pool.get().await.map_err(pool_error)
    }

    async fn query_list<T>(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
        f: fn(&Row) -> Result<T, tokio_postgres::Error>,
        operation: &'static str,
    ) -> StorageResult<Vec<T>> {
        let conn = self.get_conn().await?;
        let rows = conn.query(sql, params).await.map_err(pg_error(operation))?;
        map_rows(rows, f, operation)
    }

    async fn query_single<T>(
        &self,
        sql: &str,
        id: Uuid,
        f: fn(&Row) -> Result<T, tokio_postgres::Error>,
        entity_type: EntityType,
        operation: &'static str,
    ) -> StorageResult<T> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(sql, &[&id])
            .await
            .map_err(pg_error(operation))?
            .ok_or_else(|| not_found(entity_type, id))?;
        f(&row).map_err(pg_error(operation))
    }

    async fn exists(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
        operation: &'static str,
    ) -> StorageResult<bool> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_one(sql, params)
            .await
            .map_err(pg_error(operation))?;
        row.try_get(0).map_err(pg_error(operation))
    }

    /// Execute a write; zero affected rows becomes NotFound.
    async fn execute_one(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
        entity_type: EntityType,
        id: Uuid,
        operation: &'static str,
    ) -> StorageResult<()> {
        let conn = self.get_conn().await?;
        let affected = conn
            .execute(sql, params)
            .await
            .map_err(pg_error(operation))?;
        if affected == 0 {
            return Err(not_found(entity_type, id));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for DbClient {
    async fn ping(&self) -> StorageResult<()> {
        let conn = self.get_conn().await?;
        conn.simple_query("SELECT 1")
            .await
            .map_err(pg_error("ping"))?;
        Ok(())
    }

    // ========================================================================
    // PRODUCT OPERATIONS
    // ========================================================================

    async fn product_list(&self, inventory_id: Uuid) -> StorageResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE inventory_id = $1 ORDER BY created_at DESC",
            PRODUCT_COLUMNS
        );
        self.query_list(&sql, &[&inventory_id], product_from_row, "product_list")
            .await
    }

    async fn product_get(&self, id: Uuid) -> StorageResult<Product> {
        let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
        self.query_single(&sql, id, product_from_row, EntityType::Product, "product_get")
            .await
    }

    async fn product_images(&self, product_id: Uuid) -> StorageResult<Vec<Image>> {
        self.query_list(
            "SELECT id, url, file_key, product_id, is_primary, created_at, updated_at \
             FROM images WHERE product_id = $1 ORDER BY is_primary DESC, created_at",
            &[&product_id],
            image_from_row,
            "product_images",
        )
        .await
    }

    async fn product_categories(&self, product_id: Uuid) -> StorageResult<Vec<Category>> {
        let sql = format!(
            "SELECT {} FROM categories c \
             JOIN product_category_map pcm ON pcm.category_id = c.id \
             WHERE pcm.product_id = $1 ORDER BY c.name",
            CATEGORY_COLUMNS_C
        );
        self.query_list(&sql, &[&product_id], category_from_row, "product_categories")
            .await
    }

    async fn product_warehouses(&self, product_id: Uuid) -> StorageResult<Vec<Warehouse>> {
        let sql = format!(
            "SELECT {} FROM warehouses w \
             JOIN warehouse_product_map wpm ON wpm.warehouse_id = w.id \
             WHERE wpm.product_id = $1 ORDER BY w.name",
            WAREHOUSE_COLUMNS_W
        );
        self.query_list(&sql, &[&product_id], warehouse_from_row, "product_warehouses")
            .await
    }

    async fn product_field_exists(
        &self,
        field: ProductField,
        value: &str,
        inventory_id: Uuid,
        exclude_id: Option<Uuid>,
    ) -> StorageResult<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM products \
             WHERE {} = $1 AND inventory_id = $2 AND ($3::uuid IS NULL OR id <> $3))",
            field.column()
        );
        self.exists(&sql, &[&value, &inventory_id, &exclude_id], "product_field_exists")
            .await
    }

    async fn product_delete(&self, id: Uuid) -> StorageResult<()> {
        self.execute_one(
            "DELETE FROM products WHERE id = $1",
            &[&id],
            EntityType::Product,
            id,
            "product_delete",
        )
        .await
    }

    async fn warehouse_stock_update(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
    ) -> StorageResult<()> {
        self.execute_one(
            "UPDATE warehouse_product_map SET quantity = $1 \
             WHERE product_id = $2 AND warehouse_id = $3",
            &[&quantity, &product_id, &warehouse_id],
            EntityType::Warehouse,
            warehouse_id,
            "warehouse_stock_update",
        )
        .await
    }

    async fn category_list(&self, inventory_id: Uuid) -> StorageResult<Vec<Category>> {
        self.query_list(
            "SELECT id, name, inventory_id, created_at, updated_at \
             FROM categories WHERE inventory_id = $1 ORDER BY name",
            &[&inventory_id],
            category_from_row,
            "category_list",
        )
        .await
    }

    // ========================================================================
    // WAREHOUSE OPERATIONS
    // ========================================================================

    async fn warehouse_list(&self, inventory_id: Uuid) -> StorageResult<Vec<Warehouse>> {
        let sql = format!(
            "SELECT {} FROM warehouses WHERE inventory_id = $1 ORDER BY created_at DESC",
            WAREHOUSE_COLUMNS
        );
        self.query_list(&sql, &[&inventory_id], warehouse_from_row, "warehouse_list")
            .await
    }

    async fn warehouse_get(&self, id: Uuid) -> StorageResult<Warehouse> {
        let sql = format!("SELECT {} FROM warehouses WHERE id = $1", WAREHOUSE_COLUMNS);
        self.query_single(
            &sql,
            id,
            warehouse_from_row,
            EntityType::Warehouse,
            "warehouse_get",
        )
        .await
    }

    async fn warehouse_products(&self, warehouse_id: Uuid) -> StorageResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products p \
             JOIN warehouse_product_map wpm ON wpm.product_id = p.id \
             WHERE wpm.warehouse_id = $1 ORDER BY p.created_at DESC",
            PRODUCT_COLUMNS_P
        );
        self.query_list(&sql, &[&warehouse_id], product_from_row, "warehouse_products")
            .await
    }

    async fn warehouse_name_exists(
        &self,
        name: &str,
        inventory_id: Uuid,
        exclude_id: Option<Uuid>,
    ) -> StorageResult<bool> {
        self.exists(
            "SELECT EXISTS(SELECT 1 FROM warehouses \
             WHERE name = $1 AND inventory_id = $2 AND ($3::uuid IS NULL OR id <> $3))",
            &[&name, &inventory_id, &exclude_id],
            "warehouse_name_exists",
        )
        .await
    }

    async fn warehouse_insert(&self, warehouse: &Warehouse) -> StorageResult<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO warehouses (id, name, location, capacity, inventory_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
            &[
                &warehouse.id,
                &warehouse.name,
                &warehouse.location,
                &warehouse.capacity,
                &warehouse.inventory_id,
                &warehouse.created_at,
                &warehouse.updated_at,
            ],
        )
        .await
        .map_err(pg_error("warehouse_insert"))?;
        Ok(())
    }

    async fn warehouse_update(&self, warehouse: &Warehouse) -> StorageResult<()> {
        self.execute_one(
            "UPDATE warehouses SET name = $1, location = $2, capacity = $3, updated_at = $4 \
             WHERE id = $5",
            &[
                &warehouse.name,
                &warehouse.location,
                &warehouse.capacity,
                &warehouse.updated_at,
                &warehouse.id,
            ],
            EntityType::Warehouse,
            warehouse.id,
            "warehouse_update",
        )
        .await
    }

    async fn warehouse_delete(&self, id: Uuid) -> StorageResult<()> {
        self.execute_one(
            "DELETE FROM warehouses WHERE id = $1",
            &[&id],
            EntityType::Warehouse,
            id,
            "warehouse_delete",
        )
        .await
    }

    // ========================================================================
    // INVENTORY OPERATIONS
    // ========================================================================

    async fn inventory_list(&self, user_id: Uuid) -> StorageResult<Vec<Inventory>> {
        self.query_list(
            "SELECT id, name, user_id, created_at, updated_at \
             FROM inventories WHERE user_id = $1 ORDER BY created_at DESC",
            &[&user_id],
            inventory_from_row,
            "inventory_list",
        )
        .await
    }

    async fn inventory_get(&self, id: Uuid) -> StorageResult<Inventory> {
        self.query_single(
            "SELECT id, name, user_id, created_at, updated_at FROM inventories WHERE id = $1",
            id,
            inventory_from_row,
            EntityType::Inventory,
            "inventory_get",
        )
        .await
    }

    async fn inventory_insert(&self, inventory: &Inventory) -> StorageResult<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO inventories (id, name, user_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5)",
            &[
                &inventory.id,
                &inventory.name,
                &inventory.user_id,
                &inventory.created_at,
                &inventory.updated_at,
            ],
        )
        .await
        .map_err(pg_error("inventory_insert"))?;
        Ok(())
    }

    async fn inventory_update(&self, inventory: &Inventory) -> StorageResult<()> {
        self.execute_one(
            "UPDATE inventories SET name = $1, updated_at = $2 WHERE id = $3",
            &[&inventory.name, &inventory.updated_at, &inventory.id],
            EntityType::Inventory,
            inventory.id,
            "inventory_update",
        )
        .await
    }

    async fn inventory_delete(&self, id: Uuid) -> StorageResult<()> {
        self.execute_one(
            "DELETE FROM inventories WHERE id = $1",
            &[&id],
            EntityType::Inventory,
            id,
            "inventory_delete",
        )
        .await
    }

    // ========================================================================
    // USER OPERATIONS
    // ========================================================================

    async fn user_insert(&self, user: &User) -> StorageResult<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO users (id, username, email, password, role, avatar, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            &[
                &user.id,
                &user.username,
                &user.email,
                &user.password,
                &user.role,
                &user.avatar,
                &user.created_at,
                &user.updated_at,
            ],
        )
        .await
        .map_err(pg_error("user_insert"))?;
        Ok(())
    }

    async fn user_get(&self, id: Uuid) -> StorageResult<User> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        self.query_single(&sql, id, user_from_row, EntityType::User, "user_get")
            .await
    }

    async fn user_get_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row = conn
            .query_opt(&sql, &[&email])
            .await
            .map_err(pg_error("user_get_by_email"))?;
        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(pg_error("user_get_by_email"))
    }

    async fn username_exists(&self, username: &str) -> StorageResult<bool> {
        self.exists(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)",
            &[&username],
            "username_exists",
        )
        .await
    }

    async fn email_exists(&self, email: &str) -> StorageResult<bool> {
        self.exists(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
            &[&email],
            "email_exists",
        )
        .await
    }

    // ========================================================================
    // TRANSACTIONS
    // ========================================================================

    async fn begin(&self) -> StorageResult<Box<dyn CatalogTransaction>> {
        let conn = self.get_conn().await?;
        conn.batch_execute("BEGIN").await.map_err(pg_error("begin"))?;
        Ok(Box::new(PgTransaction { conn: Some(conn) }))
    }
}

// ============================================================================
// TRANSACTION HANDLE
// ============================================================================

/// Transaction bound to one pooled connection.
///
/// The connection is returned to the pool only after COMMIT or ROLLBACK
/// succeeds. Any other exit detaches it from the pool so the server aborts
/// the open transaction when the socket closes.
struct PgTransaction {
    conn: Option<Object>,
}

impl PgTransaction {
    fn conn(&self) -> StorageResult<&Object> {
        self.conn.as_ref().ok_or_else(|| StorageError::TransactionFailed {
            reason: "transaction already finished".to_string(),
        })
    }

    async fn finish(mut self: Box<Self>, statement: &'static str) -> StorageResult<()> {
        let conn = self.conn.take().ok_or_else(|| StorageError::TransactionFailed {
            reason: "transaction already finished".to_string(),
        })?;
        match conn.batch_execute(statement).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = Object::take(conn);
                Err(pg_error(if statement == "COMMIT" { "commit" } else { "rollback" })(e))
            }
        }
    }
}

impl Drop for PgTransaction {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::warn!("transaction dropped while open, discarding connection");
            let _ = Object::take(conn);
        }
    }
}

#[async_trait]
impl CatalogTransaction for PgTransaction {
    async fn insert_product(&mut self, product: &Product) -> StorageResult<()> {
        let sql = format!(
            "INSERT INTO products ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
            PRODUCT_COLUMNS
        );
        self.conn()?
            .execute(
                &sql,
                &[
                    &product.id,
                    &product.name,
                    &product.sku,
                    &product.code,
                    &product.brand,
                    &product.model,
                    &product.description,
                    &product.quantity,
                    &product.restock_level,
                    &product.optimal_level,
                    &product.cost,
                    &product.price,
                    &product.inventory_id,
                    &product.created_at,
                    &product.updated_at,
                ],
            )
            .await
            .map_err(pg_error("insert_product"))?;
        Ok(())
    }

    async fn update_product(&mut self, product: &Product) -> StorageResult<u64> {
        self.conn()?
            .execute(
                "UPDATE products SET name = $1, sku = $2, code = $3, brand = $4, model = $5, \
                 description = $6, quantity = $7, restock_level = $8, optimal_level = $9, \
                 cost = $10, price = $11, updated_at = $12 WHERE id = $13",
                &[
                    &product.name,
                    &product.sku,
                    &product.code,
                    &product.brand,
                    &product.model,
                    &product.description,
                    &product.quantity,
                    &product.restock_level,
                    &product.optimal_level,
                    &product.cost,
                    &product.price,
                    &product.updated_at,
                    &product.id,
                ],
            )
            .await
            .map_err(pg_error("update_product"))
    }

    async fn clear_product_relations(&mut self, product_id: Uuid) -> StorageResult<()> {
        let conn = self.conn()?;
        for sql in [
            "DELETE FROM images WHERE product_id = $1",
            "DELETE FROM product_category_map WHERE product_id = $1",
            "DELETE FROM warehouse_product_map WHERE product_id = $1",
        ] {
            conn.execute(sql, &[&product_id])
                .await
                .map_err(pg_error("clear_product_relations"))?;
        }
        Ok(())
    }

    async fn insert_image(&mut self, image: &Image) -> StorageResult<()> {
        self.conn()?
            .execute(
                "INSERT INTO images (id, url, file_key, product_id, is_primary, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
                &[
                    &image.id,
                    &image.url,
                    &image.file_key,
                    &image.product_id,
                    &image.is_primary,
                    &image.created_at,
                    &image.updated_at,
                ],
            )
            .await
            .map_err(pg_error("insert_image"))?;
        Ok(())
    }

    async fn find_category(
        &mut self,
        name: &str,
        inventory_id: Uuid,
    ) -> StorageResult<Option<Category>> {
        let row = self
            .conn()?
            .query_opt(
                "SELECT id, name, inventory_id, created_at, updated_at \
                 FROM categories WHERE name = $1 AND inventory_id = $2",
                &[&name, &inventory_id],
            )
            .await
            .map_err(pg_error("find_category"))?;
        row.as_ref()
            .map(category_from_row)
            .transpose()
            .map_err(pg_error("find_category"))
    }

    async fn insert_category(&mut self, category: &Category) -> StorageResult<()> {
        self.conn()?
            .execute(
                "INSERT INTO categories (id, name, inventory_id, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5)",
                &[
                    &category.id,
                    &category.name,
                    &category.inventory_id,
                    &category.created_at,
                    &category.updated_at,
                ],
            )
            .await
            .map_err(pg_error("insert_category"))?;
        Ok(())
    }

    async fn link_category(&mut self, product_id: Uuid, category_id: Uuid) -> StorageResult<()> {
        self.conn()?
            .execute(
                "INSERT INTO product_category_map (product_id, category_id) VALUES ($1, $2)",
                &[&product_id, &category_id],
            )
            .await
            .map_err(pg_error("link_category"))?;
        Ok(())
    }

    async fn link_warehouse(
        &mut self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> StorageResult<()> {
        self.conn()?
            .execute(
                "INSERT INTO warehouse_product_map (product_id, warehouse_id, quantity, created_at) \
                 VALUES ($1, $2, 0, now())",
                &[&product_id, &warehouse_id],
            )
            .await
            .map_err(pg_error("link_warehouse"))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StorageResult<()> {
        self.finish("COMMIT").await
    }

    async fn rollback(self: Box<Self>) -> StorageResult<()> {
        self.finish("ROLLBACK").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_defaults() {
        let config = DbConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5432);
        assert_eq!(config.dbname, "venntry");
        assert_eq!(config.max_size, 16);
        assert!(config.url.is_none());
    }

    #[test]
    fn test_create_pool_does_not_connect() {
        let config = DbConfig {
            url: Some("postgres://postgres@127.0.0.1:1/venntry".to_string()),
            max_size: 2,
            ..DbConfig::default()
        };
        let pool = config.create_pool().unwrap();
        assert_eq!(pool.status().max_size, 2);
    }

    #[test]
    fn test_column_lists_line_up() {
        let plain: Vec<&str> = PRODUCT_COLUMNS.split(", ").collect();
        let prefixed: Vec<String> = PRODUCT_COLUMNS_P
            .split(", ")
            .map(|c| c.trim_start_matches("p.").to_string())
            .collect();
        assert_eq!(plain.len(), 15);
        assert_eq!(plain, prefixed);
    }
}
