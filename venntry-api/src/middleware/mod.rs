//! Middleware modules for the Venntry API
//!
//! - `auth`: bearer-token authentication and the `AuthExtractor`
//!
//! Auth is layered on the protected sub-router only; health, register,
//! login and check-token stay public.

mod auth;

pub use auth::{auth_middleware, AuthExtractor, AuthMiddlewareError, AuthMiddlewareState};
