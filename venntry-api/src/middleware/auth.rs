//! Axum Middleware for Authentication
//!
//! This module provides Axum middleware that:
//! - Requires `Authorization: Bearer <jwt>` on protected routes
//! - Validates the token signature and expiry
//! - Loads the user from the relational store
//! - Injects AuthContext into request extensions
//! - Returns 401 for unauthenticated requests

use crate::auth::{extract_bearer_token, validate_jwt_token, AuthConfig, AuthContext};
use crate::cached_db::CachedCatalog;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

// ============================================================================
// MIDDLEWARE STATE
// ============================================================================

/// Shared state for authentication middleware.
#[derive(Clone)]
pub struct AuthMiddlewareState {
    pub auth_config: Arc<AuthConfig>,
    pub catalog: CachedCatalog,
}

impl AuthMiddlewareState {
    pub fn new(auth_config: Arc<AuthConfig>, catalog: CachedCatalog) -> Self {
        Self {
            auth_config,
            catalog,
        }
    }
}

// ============================================================================
// MIDDLEWARE FUNCTION
// ============================================================================

/// Axum middleware for authentication.
///
/// # Example
///
/// ```ignore
/// let auth_state = AuthMiddlewareState::new(auth_config, catalog);
///
/// let app = Router::new()
///     .route("/api/inventories", get(list_inventories))
///     .layer(middleware::from_fn_with_state(auth_state, auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthMiddlewareError> {
    let auth_header = request
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok());

    let auth_context = authenticate(&state, auth_header)
        .await
        .map_err(AuthMiddlewareError)?;

    tracing::debug!(user_id = %auth_context.user_id(), "request authenticated");
    request.extensions_mut().insert(auth_context);

    Ok(next.run(request).await)
}

async fn authenticate(
    state: &AuthMiddlewareState,
    auth_header: Option<&str>,
) -> ApiResult<AuthContext> {
    let header = auth_header.ok_or_else(|| ApiError::unauthorized("No token provided"))?;
    let token = extract_bearer_token(header)?;
    let claims = validate_jwt_token(&state.auth_config, token)?;

    let user = match state.catalog.user_get(claims.user_id).await {
        Ok(user) => user,
        Err(e) if e.is_not_found() => {
            return Err(ApiError::unauthorized("User not found"));
        }
        Err(e) => return Err(e.into()),
    };

    Ok(AuthContext { user, claims })
}

// ============================================================================
// ERROR TYPE
// ============================================================================

/// Error wrapper returned by the middleware.
#[derive(Debug)]
pub struct AuthMiddlewareError(pub ApiError);

impl IntoResponse for AuthMiddlewareError {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

// ============================================================================
// TYPED EXTRACTOR
// ============================================================================

/// Typed Axum extractor for the authenticated caller.
///
/// The `auth_middleware` must be applied to the route. Without it the
/// extractor rejects with 500.
#[derive(Debug, Clone)]
pub struct AuthExtractor(pub AuthContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthExtractor
where
    S: Send + Sync,
{
    type Rejection = AuthMiddlewareError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(AuthExtractor)
            .ok_or_else(|| {
                AuthMiddlewareError(ApiError::internal_error(
                    "AuthContext not found in request extensions",
                ))
            })
    }
}

impl std::ops::Deref for AuthExtractor {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{generate_jwt_token, FixedClock};
    use crate::error::ErrorCode;
    use venntry_storage::{CacheConfig, InMemoryCacheStore};
    use venntry_test_utils::fixtures;

    fn state() -> (AuthMiddlewareState, venntry_core::User) {
        let (store, user, ..) = fixtures::seeded_store();
        let catalog = CachedCatalog::new(
            Arc::new(store),
            Arc::new(InMemoryCacheStore::new()),
            CacheConfig::default(),
        );
        let config = AuthConfig::with_secret("middleware-test-secret-0123456789abcdef")
            .with_clock(Arc::new(FixedClock(1704067200)));
        (AuthMiddlewareState::new(Arc::new(config), catalog), user)
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let (state, _) = state();
        let err = authenticate(&state, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn test_valid_token_loads_user() {
        let (state, user) = state();
        let token = generate_jwt_token(&state.auth_config, &user).unwrap();
        let header = format!("Bearer {}", token);

        let ctx = authenticate(&state, Some(&header)).await.unwrap();
        assert_eq!(ctx.user_id(), user.id);
        assert_eq!(ctx.claims.email, user.email);
    }

    #[tokio::test]
    async fn test_unknown_user_is_unauthorized() {
        let (state, _) = state();
        let stranger = fixtures::user("stranger");
        let token = generate_jwt_token(&state.auth_config, &stranger).unwrap();
        let header = format!("Bearer {}", token);

        let err = authenticate(&state, Some(&header)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }
}
