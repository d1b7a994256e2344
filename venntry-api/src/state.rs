//! Shared application state for Axum routers.

use std::sync::Arc;

use crate::auth::AuthConfig;
use crate::cached_db::CachedCatalog;
use crate::middleware::AuthMiddlewareState;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Catalog facade. Handlers never touch the cache store directly.
    pub catalog: CachedCatalog,
    pub auth: Arc<AuthConfig>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(catalog: CachedCatalog, auth: AuthConfig) -> Self {
        Self {
            catalog,
            auth: Arc::new(auth),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn auth_middleware_state(&self) -> AuthMiddlewareState {
        AuthMiddlewareState::new(self.auth.clone(), self.catalog.clone())
    }
}

crate::impl_from_ref!(CachedCatalog, catalog);
crate::impl_from_ref!(Arc<AuthConfig>, auth);
crate::impl_from_ref!(std::time::Instant, start_time);
