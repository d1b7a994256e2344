//! Venntry Storage - Relational Boundary and Read-Through Cache
//!
//! Defines the catalog storage traits, the transactional product write path,
//! and the cache layer that sits between the relational store and the read
//! paths. The PostgreSQL implementation lives in venntry-api.

pub mod cache;
pub mod mock;
pub mod store;
pub mod write_path;

pub use cache::{
    CacheConfig, CacheKey, CacheStats, CacheStore, CachedEntry, InMemoryCacheStore,
    InvalidationCoordinator, ReadThroughCache, RedisCacheConfig, RedisCacheStore, StorageFetcher,
    CATALOG_TTL,
};
pub use mock::{FailPoint, MockCatalogStore};
pub use store::{CatalogStore, CatalogTransaction};
pub use write_path::{create_product, update_product, ProductWrite};
