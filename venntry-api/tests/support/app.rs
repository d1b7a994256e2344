use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt;
use venntry_api::{
    auth::{generate_jwt_token, hash_password, AuthConfig},
    create_api_router, ApiConfig, AppState, CachedCatalog,
};
use venntry_storage::CacheConfig;
use venntry_test_utils::{fixtures, FakeCacheStore, Inventory, MockCatalogStore, User, Warehouse};

pub const TEST_SECRET: &str = "router-test-secret-0123456789abcdef";
pub const TEST_PASSWORD: &str = "hunter22";

/// Router over a seeded mock store, plus handles for assertions.
pub struct TestApp {
    pub router: Router,
    pub store: MockCatalogStore,
    pub cache: Arc<FakeCacheStore>,
    pub user: User,
    pub inventory: Inventory,
    pub warehouse: Warehouse,
    pub token: String,
}

pub fn test_app() -> TestApp {
    let store = MockCatalogStore::new();
    let mut user = fixtures::user("owner");
    user.password = hash_password(TEST_PASSWORD).expect("hash test password");
    let inventory = fixtures::inventory(user.id, "Main");
    let warehouse = fixtures::warehouse(inventory.id, "North");
    store.seed_user(user.clone());
    store.seed_inventory(inventory.clone());
    store.seed_warehouse(warehouse.clone());

    let cache = Arc::new(FakeCacheStore::new());
    let catalog = CachedCatalog::new(Arc::new(store.clone()), cache.clone(), CacheConfig::default());
    let auth = AuthConfig::with_secret(TEST_SECRET);
    let token = generate_jwt_token(&auth, &user).expect("generate test token");

    let state = AppState::new(catalog, auth);
    let router = create_api_router(state, &ApiConfig::default());

    TestApp {
        router,
        store,
        cache,
        user,
        inventory,
        warehouse,
        token,
    }
}

impl TestApp {
    /// Send a request with the test user's token.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let header = format!("Bearer {}", self.token);
        self.send_with(method, uri, body, Some(&header)).await
    }

    pub async fn send_with(
        &self,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
        authorization: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(value) = authorization {
            builder = builder.header("authorization", value);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }
}
