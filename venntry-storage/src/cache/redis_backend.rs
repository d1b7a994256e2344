//! Redis cache store over a deadpool-redis pool.

use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands};
use deadpool_redis::{Connection, Pool, Runtime};
use std::time::Duration;
use venntry_core::{CacheError, CacheResult};

use super::traits::CacheStore;

/// Connection settings for [`RedisCacheStore`].
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    pub url: String,
    pub pool_size: usize,
    pub timeout_ms: u64,
}

impl RedisCacheConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pool_size: 16,
            timeout_ms: 2000,
        }
    }
}

/// Shared cache store for multi-instance deployments.
///
/// Uses `GET`, `SET EX` and `DEL`. Pool timeouts surface as
/// [`CacheError::Backend`] so callers can fall back to the database.
#[derive(Clone)]
pub struct RedisCacheStore {
    pool: Pool,
}

impl RedisCacheStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Build a pool from a Redis URL. No connection is opened yet.
    pub fn from_config(config: &RedisCacheConfig) -> CacheResult<Self> {
        let mut redis_config = deadpool_redis::Config::from_url(&config.url);
        let timeout = Duration::from_millis(config.timeout_ms);
        let pool_config = redis_config
            .pool
            .get_or_insert_with(|| deadpool_redis::PoolConfig::new(config.pool_size));
        pool_config.max_size = config.pool_size;
        pool_config.timeouts.wait = Some(timeout);
        pool_config.timeouts.create = Some(timeout);
        pool_config.timeouts.recycle = Some(timeout);

        let pool = redis_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Backend {
                reason: format!("failed to create Redis pool: {}", e),
            })?;
        Ok(Self { pool })
    }

    /// Round-trip a `PING` to verify the server is reachable.
    pub async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(backend_error)?;
        Ok(())
    }

    async fn conn(&self) -> CacheResult<Connection> {
        self.pool.get().await.map_err(|e| CacheError::Backend {
            reason: format!("failed to get Redis connection: {}", e),
        })
    }
}

fn backend_error(e: redis::RedisError) -> CacheError {
    CacheError::Backend {
        reason: e.to_string(),
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.conn().await?;
        conn.get::<_, Option<Vec<u8>>>(key)
            .await
            .map_err(backend_error)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        // SET EX rejects a zero expiry.
        let ttl_secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .map_err(backend_error)
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(key).await.map_err(backend_error)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = RedisCacheConfig::new("redis://localhost:6379");
        assert_eq!(config.pool_size, 16);
        assert_eq!(config.timeout_ms, 2000);
    }

    #[test]
    fn test_from_config_builds_pool_without_connecting() {
        let config = RedisCacheConfig {
            url: "redis://127.0.0.1:1".to_string(),
            pool_size: 4,
            timeout_ms: 50,
        };
        let store = RedisCacheStore::from_config(&config).unwrap();
        assert_eq!(store.backend_name(), "redis");
        assert_eq!(store.pool.status().max_size, 4);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_backend_error() {
        let config = RedisCacheConfig {
            url: "redis://127.0.0.1:1".to_string(),
            pool_size: 1,
            timeout_ms: 200,
        };
        let store = RedisCacheStore::from_config(&config).unwrap();
        let err = store.get("product:x").await.unwrap_err();
        assert!(matches!(err, CacheError::Backend { .. }));
    }
}
