//! REST API Routes Module
//!
//! Route handlers organized by entity type:
//! - Accounts (register, login, profile, token check)
//! - Inventories with their nested products, categories and warehouses
//! - Products and per-warehouse stock
//! - Warehouses
//! - Health check endpoints
//!
//! Everything under `/api` except the public account routes requires a
//! bearer token.

pub mod auth;
pub mod health;
pub mod inventory;
pub mod product;
pub mod warehouse;

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ApiConfig;
use crate::middleware::auth_middleware;
use crate::state::AppState;

const CORS_MAX_AGE_SECS: u64 = 3600;

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// In production mode, only allows configured origins.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(CORS_MAX_AGE_SECS));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

/// Create the complete API router.
///
/// Layers, outermost first:
/// 1. CORS
/// 2. Request tracing
/// 3. Authentication (protected routes only)
pub fn create_api_router(state: AppState, api_config: &ApiConfig) -> Router {
    let protected = Router::new()
        .route("/auth/user-profile", get(auth::user_profile))
        .nest("/inventories", inventory::create_router())
        .nest("/products", product::create_router())
        .nest("/warehouses", warehouse::create_router())
        .layer(from_fn_with_state(
            state.auth_middleware_state(),
            auth_middleware,
        ));

    let api = Router::new()
        .nest("/auth", auth::public_router())
        .merge(protected);

    Router::new()
        .nest("/api", api)
        .nest("/health", health::create_router())
        // Applied innermost-first: CORS remains the outermost layer, wrapping Trace.
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(api_config))
        .with_state(state)
}
