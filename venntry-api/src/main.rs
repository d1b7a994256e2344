//! Venntry API Server Entry Point
//!
//! Bootstraps configuration, connects the database pool and cache backend,
//! and starts the Axum HTTP server.

use axum::Router;
use venntry_api::{
    cache_config_from_env, create_api_router, ApiConfig, ApiError, ApiResult, AppState,
    AuthConfig, CacheBackendConfig, CachedCatalog, DbClient, DbConfig,
};

use venntry_api::telemetry::{init_tracer, TelemetryConfig};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracer(&telemetry_config)?;

    let api_config = ApiConfig::from_env();
    let auth_config = AuthConfig::from_env();
    auth_config.validate_for_production()?;

    let db_config = DbConfig::from_env();
    let db = DbClient::from_config(&db_config)?;
    tracing::info!(max_size = db_config.max_size, "Database pool created");

    let cache_store = CacheBackendConfig::from_env().build().await;
    let catalog = CachedCatalog::new(
        std::sync::Arc::new(db),
        cache_store,
        cache_config_from_env(),
    );
    if let Err(e) = catalog.ping().await {
        tracing::warn!(error = %e, "Database not reachable at startup");
    }

    let state = AppState::new(catalog, auth_config);
    let app: Router = create_api_router(state, &api_config);

    let addr = api_config.socket_addr()?;
    tracing::info!(
        %addr,
        environment = %api_config.environment,
        domain = ?api_config.domain,
        "Starting Venntry API server"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
