//! Account REST API Routes
//!
//! Registration, login, the caller's profile and token expiry checks.
//! Passwords are hashed with Argon2 on the blocking pool.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use venntry_core::{new_entity_id, now, User};

use crate::auth::{
    extract_bearer_token, generate_jwt_token, hash_password, is_token_expired, verify_password,
    AuthConfig,
};
use crate::cached_db::CachedCatalog;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthExtractor;
use crate::state::AppState;
use crate::types::{CheckTokenResponse, LoginRequest, LoginResponse, RegisterRequest};

const DEFAULT_ROLE: &str = "user";
const INVALID_CREDENTIALS: &str = "Invalid login credentials";

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/auth/register - Create an account
pub async fn register(
    State(catalog): State<CachedCatalog>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let req = req.sanitize();
    req.validate()?;

    let store = catalog.store();
    if store.username_exists(&req.username).await? {
        return Err(ApiError::already_exists("Username already exists"));
    }
    if store.email_exists(&req.email).await? {
        return Err(ApiError::already_exists("Email already exists"));
    }

    let password = req.password;
    let hashed = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::internal_error(format!("Password hashing task failed: {}", e)))??;

    let ts = now();
    let user = User {
        id: new_entity_id(),
        username: req.username,
        email: req.email,
        password: hashed,
        role: DEFAULT_ROLE.to_string(),
        avatar: None,
        created_at: ts,
        updated_at: ts,
    };
    let user = catalog.user_create(user).await?;
    tracing::info!(user_id = %user.id, "user registered");

    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/auth/login - Exchange credentials for a token
pub async fn login(
    State(catalog): State<CachedCatalog>,
    State(auth): State<Arc<AuthConfig>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let email = req.email.trim().to_lowercase();
    let user = catalog
        .store()
        .user_get_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    let password = req.password;
    let hash = user.password.clone();
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::internal_error(format!("Password check task failed: {}", e)))?;
    if !valid {
        tracing::debug!(user_id = %user.id, "login rejected");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    let token = generate_jwt_token(&auth, &user)?;
    let inventories = catalog.inventory_list(user.id).await?;
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(LoginResponse::new(user, token, inventories)))
}

/// GET /api/auth/user-profile - The authenticated caller
pub async fn user_profile(auth: AuthExtractor) -> Json<User> {
    Json(auth.user.clone())
}

/// GET /api/auth/check-token - Report whether the bearer token has expired
///
/// A token that cannot be read at all counts as expired.
pub async fn check_token(State(auth): State<Arc<AuthConfig>>, headers: HeaderMap) -> Response {
    let Some(header) = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "No token provided" })),
        )
            .into_response();
    };

    let expired = match extract_bearer_token(header) {
        Ok(token) => is_token_expired(&auth, token),
        Err(_) => true,
    };
    Json(CheckTokenResponse { expired }).into_response()
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Routes reachable without a token. `/user-profile` is mounted with the
/// protected routes.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/check-token", get(check_token))
}
