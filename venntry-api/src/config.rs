//! API Configuration Module
//!
//! Server, CORS and cache-backend settings, loaded from environment
//! variables with development defaults.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use venntry_core::ConfigError;
use venntry_storage::{
    CacheConfig, CacheStore, InMemoryCacheStore, RedisCacheConfig, RedisCacheStore,
};

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// Server and CORS configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address
    pub bind: String,
    /// Listen port
    pub port: u16,
    /// Deployment environment (`APP_ENV`)
    pub environment: String,
    /// Public domain, informational only
    pub domain: Option<String>,
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
            environment: "development".to_string(),
            domain: None,
            cors_origins: Vec::new(),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `VENNTRY_API_BIND`: bind address (default: 0.0.0.0)
    /// - `PORT`: listen port (default: 8080)
    /// - `APP_ENV`: deployment environment (default: development)
    /// - `DOMAIN`: public domain
    /// - `VENNTRY_CORS_ORIGINS`: comma-separated allowed origins (empty = allow all)
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("VENNTRY_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            bind: std::env::var("VENNTRY_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("APP_ENV")
                .unwrap_or_else(|_| "development".to_string())
                .to_lowercase(),
            domain: std::env::var("DOMAIN").ok().filter(|s| !s.is_empty()),
            cors_origins,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production" || self.environment == "prod"
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
                field: "VENNTRY_API_BIND".to_string(),
                value: self.bind.clone(),
                reason: e.to_string(),
            })
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }
        self.cors_origins.iter().any(|allowed| allowed == origin)
    }
}

// ============================================================================
// CACHE BACKEND CONFIGURATION
// ============================================================================

/// Which cache store backs the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackendConfig {
    /// Process-local map; the default without `REDIS_URL`.
    InMemory,
    Redis {
        url: String,
        pool_size: usize,
        timeout_ms: u64,
    },
}

impl CacheBackendConfig {
    /// Environment variables:
    /// - `REDIS_URL`: enables the Redis backend when set
    /// - `VENNTRY_REDIS_POOL_SIZE`: pool size (default: 16)
    /// - `VENNTRY_REDIS_TIMEOUT_MS`: pool timeouts (default: 2000)
    pub fn from_env() -> Self {
        match std::env::var("REDIS_URL").ok().filter(|s| !s.trim().is_empty()) {
            None => CacheBackendConfig::InMemory,
            Some(url) => CacheBackendConfig::Redis {
                url,
                pool_size: std::env::var("VENNTRY_REDIS_POOL_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(16),
                timeout_ms: std::env::var("VENNTRY_REDIS_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2000),
            },
        }
    }

    /// Build the cache store.
    ///
    /// A Redis backend that cannot be created or does not answer `PING` is
    /// replaced by the in-memory store with a warning.
    pub async fn build(&self) -> Arc<dyn CacheStore> {
        match self {
            CacheBackendConfig::InMemory => {
                tracing::info!("Using in-memory cache backend");
                Arc::new(InMemoryCacheStore::new())
            }
            CacheBackendConfig::Redis {
                url,
                pool_size,
                timeout_ms,
            } => {
                let config = RedisCacheConfig {
                    url: url.clone(),
                    pool_size: *pool_size,
                    timeout_ms: *timeout_ms,
                };
                let store = match RedisCacheStore::from_config(&config) {
                    Ok(store) => store,
                    Err(e) => {
                        tracing::warn!(error = %e, "Redis cache unavailable, falling back to in-memory cache");
                        return Arc::new(InMemoryCacheStore::new());
                    }
                };
                match store.ping().await {
                    Ok(()) => {
                        tracing::info!(pool_size = *pool_size, "Using Redis cache backend");
                        Arc::new(store)
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Redis cache unavailable, falling back to in-memory cache");
                        Arc::new(InMemoryCacheStore::new())
                    }
                }
            }
        }
    }
}

/// Read-through cache settings.
///
/// `VENNTRY_CACHE_TTL_SECS` overrides the entry TTL; zero and unparsable
/// values keep the default.
pub fn cache_config_from_env() -> CacheConfig {
    match std::env::var("VENNTRY_CACHE_TTL_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
    {
        Some(secs) => CacheConfig {
            entry_ttl: Duration::from_secs(secs),
        },
        None => CacheConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.port, 8080);
        assert!(!config.is_production());
        assert_eq!(config.socket_addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_origin_allowed() {
        let mut config = ApiConfig::default();
        assert!(config.is_origin_allowed("http://localhost:3000"));

        config.cors_origins = vec!["https://venntry.app".to_string()];
        assert!(config.is_origin_allowed("https://venntry.app"));
        assert!(!config.is_origin_allowed("https://evil.com"));
    }

    #[test]
    fn test_bad_bind_address() {
        let config = ApiConfig {
            bind: "not an address".to_string(),
            ..ApiConfig::default()
        };
        assert!(matches!(
            config.socket_addr(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_redis_falls_back_to_memory() {
        let config = CacheBackendConfig::Redis {
            url: "redis://127.0.0.1:1".to_string(),
            pool_size: 1,
            timeout_ms: 200,
        };
        let store = config.build().await;
        assert_eq!(store.backend_name(), InMemoryCacheStore::new().backend_name());
    }
}
