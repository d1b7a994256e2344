//! Read-through cache over an injected [`CacheStore`].
//!
//! A read consults the store first. On a hit the payload is decoded and
//! returned; on a miss, a backend error, or an undecodable payload the value
//! is loaded through a [`StorageFetcher`] and written back on a best-effort
//! basis. A read never fails because of the cache.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use venntry_core::{CacheError, CacheResult, StorageResult};

use super::keys::CacheKey;
use super::traits::{CacheStats, CacheStore};

/// Expiry applied to every catalog cache entry.
pub const CATALOG_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Configuration for the read-through cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub entry_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            entry_ttl: CATALOG_TTL,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl = ttl;
        self
    }
}

/// Storage fetcher trait for loading a value from the relational store.
///
/// One implementation exists per cached query; the fetcher carries the
/// query parameters so the cache stays agnostic of SQL.
#[async_trait]
pub trait StorageFetcher<T>: Send + Sync {
    async fn fetch(&self) -> StorageResult<T>;
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
}

/// Read-through cache.
///
/// Cheap to clone; clones share the store and the hit/miss counters.
#[derive(Clone)]
pub struct ReadThroughCache {
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
    counters: Arc<Counters>,
}

impl fmt::Debug for ReadThroughCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadThroughCache")
            .field("backend", &self.store.backend_name())
            .field("config", &self.config)
            .finish()
    }
}

impl ReadThroughCache {
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self {
            store,
            config,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Create a new read-through cache with default configuration.
    pub fn with_defaults(store: Arc<dyn CacheStore>) -> Self {
        Self::new(store, CacheConfig::default())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get a reference to the cache store.
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Load `key`, falling back to `fetcher` on a miss or cache failure.
    ///
    /// Relational errors (including NotFound) propagate untouched. Nothing is
    /// cached when the fetch fails.
    pub async fn get<T, F>(&self, key: &CacheKey, fetcher: &F) -> StorageResult<T>
    where
        T: Serialize + DeserializeOwned + Send,
        F: StorageFetcher<T> + ?Sized,
    {
        match self.store.get(key.as_str()).await {
            Ok(Some(bytes)) => match decode::<T>(key, &bytes) {
                Ok(value) => {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(key = %key, "cache hit");
                    return Ok(value);
                }
                Err(e) => {
                    self.counters.misses.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(error = %e, "undecodable cache payload, reloading");
                }
            },
            Ok(None) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "cache miss");
            }
            Err(e) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key = %key, error = %e, "cache read failed, falling back to database");
            }
        }

        let value = fetcher.fetch().await?;
        if let Err(e) = self.populate(key, &value).await {
            tracing::warn!(key = %key, error = %e, "failed to populate cache");
        }
        Ok(value)
    }

    async fn populate<T: Serialize>(&self, key: &CacheKey, value: &T) -> CacheResult<()> {
        let bytes = encode(key, value)?;
        self.store
            .set(key.as_str(), bytes, self.config.entry_ttl)
            .await
    }

    /// Snapshot of hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
            backend: self.store.backend_name().to_string(),
        }
    }
}

fn encode<T: Serialize>(key: &CacheKey, value: &T) -> CacheResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| CacheError::Serialization {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn decode<T: DeserializeOwned>(key: &CacheKey, bytes: &[u8]) -> CacheResult<T> {
    serde_json::from_slice(bytes).map_err(|e| CacheError::Deserialization {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::InMemoryCacheStore;
    use std::sync::atomic::AtomicUsize;
    use uuid::Uuid;
    use venntry_core::{EntityType, StorageError};

    struct CountingFetcher {
        value: Vec<String>,
        calls: AtomicUsize,
    }

    impl CountingFetcher {
        fn new(value: Vec<&str>) -> Self {
            Self {
                value: value.into_iter().map(String::from).collect(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StorageFetcher<Vec<String>> for CountingFetcher {
        async fn fetch(&self) -> StorageResult<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.value.clone())
        }
    }

    struct NotFoundFetcher;

    #[async_trait]
    impl StorageFetcher<Vec<String>> for NotFoundFetcher {
        async fn fetch(&self) -> StorageResult<Vec<String>> {
            Err(StorageError::NotFound {
                entity_type: EntityType::Product,
                id: Uuid::nil(),
            })
        }
    }

    /// Store whose every operation fails.
    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
            Err(CacheError::Backend {
                reason: "connection refused".into(),
            })
        }

        async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> CacheResult<()> {
            Err(CacheError::Backend {
                reason: "connection refused".into(),
            })
        }

        async fn delete(&self, _key: &str) -> CacheResult<()> {
            Err(CacheError::Backend {
                reason: "connection refused".into(),
            })
        }

        fn backend_name(&self) -> &'static str {
            "broken"
        }
    }

    #[test]
    fn test_default_ttl_is_seven_days() {
        assert_eq!(CacheConfig::default().entry_ttl, Duration::from_secs(604_800));
        let config = CacheConfig::new().with_ttl(Duration::from_secs(5));
        assert_eq!(config.entry_ttl, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let store = Arc::new(InMemoryCacheStore::new());
        let cache = ReadThroughCache::with_defaults(store.clone());
        let fetcher = CountingFetcher::new(vec!["a", "b"]);
        let key = CacheKey::products(Uuid::now_v7());

        let first: Vec<String> = cache.get(&key, &fetcher).await.unwrap();
        let second: Vec<String> = cache.get(&key, &fetcher).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(store.len(), 1);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.backend, "memory");
    }

    #[tokio::test]
    async fn test_not_found_is_not_cached() {
        let store = Arc::new(InMemoryCacheStore::new());
        let cache = ReadThroughCache::with_defaults(store.clone());
        let key = CacheKey::product(Uuid::nil());

        let err = cache
            .get::<Vec<String>, _>(&key, &NotFoundFetcher)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_broken_store_falls_back_to_fetcher() {
        let cache = ReadThroughCache::with_defaults(Arc::new(BrokenStore));
        let fetcher = CountingFetcher::new(vec!["x"]);
        let key = CacheKey::categories(Uuid::now_v7());

        let value: Vec<String> = cache.get(&key, &fetcher).await.unwrap();
        assert_eq!(value, vec!["x".to_string()]);
        let value: Vec<String> = cache.get(&key, &fetcher).await.unwrap();
        assert_eq!(value, vec!["x".to_string()]);
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(cache.stats().errors, 2);
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_reloaded() {
        let store = Arc::new(InMemoryCacheStore::new());
        let key = CacheKey::products(Uuid::now_v7());
        store
            .set(key.as_str(), b"not json".to_vec(), CATALOG_TTL)
            .await
            .unwrap();

        let cache = ReadThroughCache::with_defaults(store.clone());
        let fetcher = CountingFetcher::new(vec!["fresh"]);
        let value: Vec<String> = cache.get(&key, &fetcher).await.unwrap();
        assert_eq!(value, vec!["fresh".to_string()]);

        let repaired = store.get(key.as_str()).await.unwrap().unwrap();
        let decoded: Vec<String> = serde_json::from_slice(&repaired).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_decode_failure_names_the_key() {
        let key = CacheKey::product(Uuid::nil());
        let err = decode::<Vec<String>>(&key, b"{").unwrap_err();
        match err {
            CacheError::Deserialization { key: failed, .. } => assert_eq!(failed, key.to_string()),
            other => panic!("expected Deserialization, got {:?}", other),
        }
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("refuses to encode"))
        }
    }

    #[tokio::test]
    async fn test_encode_failure_leaves_cache_empty() {
        let store = Arc::new(InMemoryCacheStore::new());
        let cache = ReadThroughCache::with_defaults(store.clone());
        let key = CacheKey::warehouse(Uuid::nil());

        let err = cache.populate(&key, &Unencodable).await.unwrap_err();
        assert!(matches!(err, CacheError::Serialization { .. }));
        assert!(store.is_empty());
    }
}
