//! Venntry API - REST layer for the Venntry catalog
//!
//! Accounts, inventories, products, categories and warehouses over
//! PostgreSQL. Catalog reads go through a read-through cache that every
//! write invalidates; see [`cached_db::CachedCatalog`].

mod macros;

pub mod auth;
pub mod cached_db;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use auth::{
    generate_jwt_token, hash_password, validate_jwt_token, verify_password, AuthConfig,
    AuthContext, Claims,
};
pub use cached_db::CachedCatalog;
pub use config::{cache_config_from_env, ApiConfig, CacheBackendConfig};
pub use db::{DbClient, DbConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{auth_middleware, AuthExtractor, AuthMiddlewareState};
pub use routes::create_api_router;
pub use state::AppState;
pub use types::*;
