//! Cache store trait and statistics.

use async_trait::async_trait;
use std::time::Duration;
use venntry_core::CacheResult;

/// Key-value store with per-key expiration.
///
/// Values are opaque byte payloads. Implementations must be thread-safe and
/// tolerate concurrent access from many request tasks.
///
/// # Contract
///
/// - `get` on an absent or expired key is `Ok(None)`, never an error
/// - every other backend failure (pool exhaustion, lost connection,
///   timeout) is a [`venntry_core::CacheError`]
/// - `delete` on an absent key is `Ok(())`
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get the raw payload stored under `key`.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()>;

    /// Remove `key`. Idempotent.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Short backend label for logs and health output.
    fn backend_name(&self) -> &'static str;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses, including reads that fell through on a
    /// backend error.
    pub misses: u64,
    /// Number of backend errors observed on reads.
    pub errors: u64,
    /// Backend label.
    pub backend: String,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_empty() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }
}
