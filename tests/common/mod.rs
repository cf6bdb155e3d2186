#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use sea_orm::EntityTrait;
use serde_json::{json, Value};
use tower::ServiceExt;

use inventory_api::{
    app_router,
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db,
    entities::{user, UserRole},
    services::users::CreateUserRequest,
    AppState,
};

pub const JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";
const BOUNDARY: &str = "inventory-test-boundary";

/// Application backed by a private in-memory SQLite database, with one
/// manager and one staff account already signed in.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub manager_id: i32,
    pub staff_id: i32,
    pub manager_token: String,
    pub staff_token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Like `new`, with a hook to adjust configuration before startup
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // Every connection to sqlite::memory: is a separate database
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let auth_service = Arc::new(AuthService::new(AuthConfig::from(&cfg)));
        let state = AppState::new(Arc::new(pool), cfg, auth_service);

        let manager = state
            .services
            .users
            .setup_first_manager(CreateUserRequest {
                username: "morgan".into(),
                email: "morgan@example.com".into(),
                password: "manager-pass-123".into(),
                role: None,
            })
            .await
            .expect("create manager");
        let staff = state
            .services
            .users
            .create_user(CreateUserRequest {
                username: "sam".into(),
                email: "sam@example.com".into(),
                password: "staff-pass-123".into(),
                role: Some(UserRole::Staff),
            })
            .await
            .expect("create staff");

        let manager_token = Self::mint_token(&state, manager.id).await;
        let staff_token = Self::mint_token(&state, staff.id).await;

        Self {
            router: app_router(state.clone()),
            state,
            manager_id: manager.id,
            staff_id: staff.id,
            manager_token,
            staff_token,
        }
    }

    async fn mint_token(state: &AppState, user_id: i32) -> String {
        let model = user::Entity::find_by_id(user_id)
            .one(state.db.as_ref())
            .await
            .expect("load user")
            .expect("user exists");
        state
            .auth
            .generate_token(&model)
            .expect("issue token")
            .access_token
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.send(request).await
    }

    pub async fn as_manager(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(&self.manager_token))
            .await
    }

    pub async fn as_staff(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(&self.staff_token))
            .await
    }

    /// Uploads `csv` as the multipart field `field`
    pub async fn upload_csv(&self, field: &str, csv: &str, token: &str) -> Response {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"products.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {csv}\r\n\
             --{BOUNDARY}--\r\n"
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/bulk/import")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("failed to build request");
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Creates a product through the API and returns its id
    pub async fn create_product(&self, sku: &str, quantity: i32, reorder_level: i32) -> i32 {
        let response = self
            .as_manager(
                Method::POST,
                "/api/products",
                Some(json!({
                    "sku": sku,
                    "name": format!("Product {sku}"),
                    "category": "Hardware",
                    "quantity": quantity,
                    "reorder_level": reorder_level,
                    "price": "2.50",
                })),
            )
            .await;
        assert_eq!(response.status(), 201, "creating {sku}");
        let body = response_json(response).await;
        body["data"]["id"].as_i64().expect("product id") as i32
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

pub async fn response_text(response: Response) -> String {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}
