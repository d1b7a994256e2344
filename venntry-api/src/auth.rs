//! Authentication Module
//!
//! JWT issuance and validation for the Venntry API, plus Argon2 password
//! hashing. Tokens are HS256 and carry the user id, email and role.
//!
//! Signature checks are delegated to `jsonwebtoken`; expiry is checked here
//! against an injectable [`JwtClock`] so tests are deterministic.

use crate::error::{ApiError, ApiResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use venntry_core::{ConfigError, User};

const INSECURE_DEFAULT_SECRET: &str = "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION";

// ============================================================================
// CLOCK ABSTRACTION
// ============================================================================

/// Clock used for token issue and expiry checks.
pub trait JwtClock: Send + Sync {
    /// Current time as Unix epoch seconds.
    fn now_epoch_secs(&self) -> i64;
}

/// Production clock using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl JwtClock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl JwtClock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}

// ============================================================================
// JWT SECRET
// ============================================================================

/// JWT signing secret that never shows up in logs.
#[derive(Clone)]
pub struct JwtSecret(SecretString);

impl JwtSecret {
    /// # Errors
    /// Returns error if the secret is empty.
    pub fn new(secret: String) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "JWT_SECRET".to_string(),
            });
        }
        Ok(Self(SecretString::new(secret.into())))
    }

    /// Expose the secret value for signing and verification.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    pub fn is_insecure_default(&self) -> bool {
        self.0.expose_secret() == INSECURE_DEFAULT_SECRET
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtSecret([REDACTED, {} chars])", self.len())
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: JwtSecret,
    pub jwt_algorithm: Algorithm,
    /// Token lifetime in seconds
    pub jwt_expiration_secs: i64,
    /// Expiry tolerance in seconds
    pub jwt_clock_skew_secs: i64,
    pub clock: Arc<dyn JwtClock>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret)
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("jwt_expiration_secs", &self.jwt_expiration_secs)
            .field("jwt_clock_skew_secs", &self.jwt_clock_skew_secs)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: build_jwt_secret(String::new()),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: 86400,
            jwt_clock_skew_secs: 60,
            clock: Arc::new(SystemClock),
        }
    }
}

impl AuthConfig {
    /// Create authentication configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: signing secret
    /// - `VENNTRY_JWT_EXPIRATION_SECS`: token lifetime (default: 86400)
    /// - `VENNTRY_JWT_CLOCK_SKEW_SECS`: expiry tolerance (default: 60)
    pub fn from_env() -> Self {
        let secret_str = std::env::var("JWT_SECRET").unwrap_or_default();

        Self {
            jwt_secret: build_jwt_secret(secret_str),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: std::env::var("VENNTRY_JWT_EXPIRATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(86400),
            jwt_clock_skew_secs: std::env::var("VENNTRY_JWT_CLOCK_SKEW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            clock: Arc::new(SystemClock),
        }
    }

    /// Config with an explicit secret, for tests and embedding.
    pub fn with_secret(secret: &str) -> Self {
        Self {
            jwt_secret: build_jwt_secret(secret.to_string()),
            ..Self::default()
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn JwtClock>) -> Self {
        self.clock = clock;
        self
    }

    /// Refuse the insecure default secret when `APP_ENV` is production.
    ///
    /// In other environments a warning is logged and startup continues.
    pub fn validate_for_production(&self) -> ApiResult<()> {
        let environment = std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase();
        self.validate_for_environment(&environment)
    }

    fn validate_for_environment(&self, environment: &str) -> ApiResult<()> {
        let is_production = environment == "production" || environment == "prod";

        if self.jwt_secret.is_insecure_default() {
            if is_production {
                return Err(ApiError::invalid_input(format!(
                    "Cannot start server in production with insecure JWT secret. \
                     Set JWT_SECRET to a secure value. APP_ENV={}",
                    environment
                )));
            }
            tracing::warn!(
                "Using insecure default JWT secret. Set JWT_SECRET before deploying."
            );
        } else if self.jwt_secret.len() < 32 {
            if is_production {
                return Err(ApiError::invalid_input(format!(
                    "JWT secret is too short for production use ({} chars). \
                     It must be at least 32 characters long.",
                    self.jwt_secret.len()
                )));
            }
            tracing::warn!(
                length = self.jwt_secret.len(),
                "JWT secret is shorter than 32 characters"
            );
        }

        Ok(())
    }
}

fn build_jwt_secret(secret_str: String) -> JwtSecret {
    let normalized = if secret_str.trim().is_empty() {
        INSECURE_DEFAULT_SECRET.to_string()
    } else {
        secret_str
    };

    match JwtSecret::new(normalized) {
        Ok(secret) => secret,
        Err(_) => JwtSecret(SecretString::new(INSECURE_DEFAULT_SECRET.to_string().into())),
    }
}

// ============================================================================
// JWT CLAIMS
// ============================================================================

/// JWT claims issued at login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn new(user: &User, expiration_secs: i64, clock: &dyn JwtClock) -> Self {
        let now = clock.now_epoch_secs();
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role.clone(),
            iat: now,
            exp: now + expiration_secs,
        }
    }

    /// Expired according to `clock`, ignoring skew.
    pub fn is_expired(&self, clock: &dyn JwtClock) -> bool {
        self.exp < clock.now_epoch_secs()
    }
}

// ============================================================================
// AUTHENTICATION CONTEXT
// ============================================================================

/// Authenticated caller, inserted into request extensions by the auth
/// middleware.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
    pub claims: Claims,
}

impl AuthContext {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }
}

// ============================================================================
// TOKEN FUNCTIONS
// ============================================================================

fn signature_validation(config: &AuthConfig) -> Validation {
    let mut validation = Validation::new(config.jwt_algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.required_spec_claims = std::collections::HashSet::from(["exp".to_string()]);
    validation
}

fn decode_claims(config: &AuthConfig, token: &str) -> ApiResult<Claims> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.expose().as_bytes());
    decode::<Claims>(token, &decoding_key, &signature_validation(config))
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::InvalidToken => {
                ApiError::invalid_token("Token is invalid")
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                ApiError::invalid_token("Token signature is invalid")
            }
            _ => ApiError::invalid_token(format!("Token validation failed: {}", e)),
        })
}

/// Validate a JWT and return its claims.
///
/// Expired tokens (beyond the configured skew) fail with `TokenExpired`.
pub fn validate_jwt_token(config: &AuthConfig, token: &str) -> ApiResult<Claims> {
    let claims = decode_claims(config, token)?;

    let now = config.clock.now_epoch_secs();
    if now < 0 {
        tracing::error!(timestamp = now, "System clock returned pre-epoch time");
        return Err(ApiError::internal_error("Server time configuration error"));
    }
    if claims.exp < now - config.jwt_clock_skew_secs {
        return Err(ApiError::token_expired());
    }

    Ok(claims)
}

/// Issue a token for `user`.
pub fn generate_jwt_token(config: &AuthConfig, user: &User) -> ApiResult<String> {
    let claims = Claims::new(user, config.jwt_expiration_secs, &*config.clock);
    let encoding_key = EncodingKey::from_secret(config.jwt_secret.expose().as_bytes());
    let header = Header::new(config.jwt_algorithm);

    encode(&header, &claims, &encoding_key)
        .map_err(|e| ApiError::internal_error(format!("Failed to generate token: {}", e)))
}

/// True when the token is expired, malformed, or signed with another key.
pub fn is_token_expired(config: &AuthConfig, token: &str) -> bool {
    validate_jwt_token(config, token).is_err()
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn extract_bearer_token(header_value: &str) -> ApiResult<&str> {
    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("Authorization header must use Bearer scheme"))?
        .trim();
    if token.is_empty() {
        return Err(ApiError::unauthorized("Bearer token is empty"));
    }
    Ok(token)
}

// ============================================================================
// PASSWORD HASHING
// ============================================================================

/// Hash a password with Argon2id into a PHC string.
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            tracing::error!(error = %e, "password hashing failed");
            ApiError::internal_error("Failed to hash password")
        })
}

/// Check a password against a stored PHC string. A malformed hash never
/// matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is malformed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use venntry_core::{new_entity_id, now};

    // 2024-01-01 00:00:00 UTC
    const T0: i64 = 1704067200;

    fn user() -> User {
        let ts = now();
        User {
            id: new_entity_id(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: String::new(),
            role: "user".into(),
            avatar: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    fn config_at(secs: i64) -> AuthConfig {
        AuthConfig::with_secret("test-secret-that-is-long-enough-123456")
            .with_clock(Arc::new(FixedClock(secs)))
    }

    #[test]
    fn test_token_round_trip() {
        let config = config_at(T0);
        let user = user();
        let token = generate_jwt_token(&config, &user).unwrap();
        let claims = validate_jwt_token(&config, &token).unwrap();
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.role, "user");
        assert_eq!(claims.exp - claims.iat, 86400);
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = generate_jwt_token(&config_at(T0), &user()).unwrap();
        let later = config_at(T0 + 86400 + 61);
        let err = validate_jwt_token(&later, &token).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenExpired);
        assert!(is_token_expired(&later, &token));
    }

    #[test]
    fn test_expiry_within_skew_is_accepted() {
        let token = generate_jwt_token(&config_at(T0), &user()).unwrap();
        let later = config_at(T0 + 86400 + 30);
        assert!(validate_jwt_token(&later, &token).is_ok());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = generate_jwt_token(&config_at(T0), &user()).unwrap();
        let other = AuthConfig::with_secret("another-secret-entirely-0000000000000")
            .with_clock(Arc::new(FixedClock(T0)));
        let err = validate_jwt_token(&other, &token).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidToken);
    }

    #[test]
    fn test_garbage_token_counts_as_expired() {
        assert!(is_token_expired(&config_at(T0), "not.a.jwt"));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc").unwrap(), "abc");
        assert!(extract_bearer_token("Basic abc").is_err());
        assert!(extract_bearer_token("Bearer   ").is_err());
    }

    #[test]
    fn test_password_hash_and_verify() {
        let hash = hash_password("secret1").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("secret1", &hash));
        assert!(!verify_password("secret2", &hash));
        assert!(!verify_password("secret1", "not-a-phc-string"));
    }

    #[test]
    fn test_default_secret_rejected_in_production() {
        let config = AuthConfig::default();
        assert!(config.jwt_secret.is_insecure_default());
        assert!(config.validate_for_environment("production").is_err());
        assert!(config.validate_for_environment("development").is_ok());
    }

    #[test]
    fn test_short_secret_rejected_in_production() {
        let config = AuthConfig::with_secret("short");
        assert!(config.validate_for_environment("prod").is_err());
        let strong = AuthConfig::with_secret(&"x".repeat(40));
        assert!(strong.validate_for_environment("production").is_ok());
    }

    #[test]
    fn test_secret_is_redacted_in_debug() {
        let config = AuthConfig::with_secret("super-secret-value");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret-value"));
        assert!(rendered.contains("REDACTED"));
    }
}
