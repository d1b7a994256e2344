//! Read-through cache and write invalidation for catalog aggregates.
//!
//! The relational store is always authoritative. The cache only ever holds
//! JSON snapshots of query results keyed by [`CacheKey`], is populated as a
//! side effect of a read miss, and is purged by the
//! [`InvalidationCoordinator`] after a write commits.
//!
//! Cache failures never fail a read or a write: reads fall back to the
//! store, and population or invalidation errors are logged and dropped.
//!
//! # Example
//!
//! ```ignore
//! let cache = ReadThroughCache::new(store, CacheConfig::default());
//! let products: Vec<Product> = cache
//!     .get(&CacheKey::products(inventory_id), &ProductListFetcher { db, inventory_id })
//!     .await?;
//! ```

pub mod invalidation;
pub mod keys;
pub mod memory;
pub mod read_through;
pub mod redis_backend;
pub mod traits;

pub use invalidation::InvalidationCoordinator;
pub use keys::CacheKey;
pub use memory::{CachedEntry, InMemoryCacheStore};
pub use read_through::{CacheConfig, ReadThroughCache, StorageFetcher, CATALOG_TTL};
pub use redis_backend::{RedisCacheConfig, RedisCacheStore};
pub use traits::{CacheStats, CacheStore};
