//! Shared helpers for API integration tests
//!
//! Router tests run in-process through `tower::ServiceExt::oneshot`.
//! [`TestContext::new`] needs PostgreSQL at `DATABASE_URL` and returns `None`
//! when it is unset, so database-backed tests skip themselves.
//! [`lazy_app`] never connects and suits tests that are rejected before any
//! query runs.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::PgPool;
use std::time::Duration;
use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::Config;
use taskboard_shared::db::migrations::run_migrations;
use taskboard_shared::db::pool::{create_lazy_pool, create_pool, DatabaseConfig};
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "api-test-secret-key-at-least-32-bytes";
pub const TEST_PASSWORD: &str = "correct horse battery";

pub fn test_config(database_url: &str) -> Config {
    let database_url = database_url.to_string();
    Config::from_lookup(move |key| match key {
        "DATABASE_URL" => Some(database_url.clone()),
        "JWT_SECRET" => Some(TEST_SECRET.to_string()),
        _ => None,
    })
    .expect("test configuration is valid")
}

/// Router over a pool that never connects
pub fn lazy_app() -> Router {
    let url = "postgresql://taskboard@127.0.0.1:1/unreachable";
    let pool = create_lazy_pool(&DatabaseConfig {
        acquire_timeout: Duration::from_secs(1),
        ..DatabaseConfig::new(url)
    })
    .expect("lazy pool");

    build_router(AppState::new(pool, test_config(url)))
}

/// A registered user and their access token
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

impl TestUser {
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
}

impl TestContext {
    pub async fn new() -> Option<Self> {
        let url = std::env::var("DATABASE_URL").ok()?;

        let db = create_pool(DatabaseConfig::new(url.clone()).with_max_connections(5))
            .await
            .expect("DATABASE_URL is set but the database is unreachable");
        run_migrations(&db).await.expect("migrations failed");

        let app = build_router(AppState::new(db.clone(), test_config(&url)));
        Some(Self { db, app })
    }

    /// Registers a user with a unique email through the API
    pub async fn register(&self, name: &str) -> TestUser {
        let email = format!("{}-{}@example.com", name.to_lowercase(), Uuid::new_v4());
        let (status, body) = self
            .send(
                Method::POST,
                "/v1/auth/register",
                None,
                Some(serde_json::json!({
                    "name": name,
                    "email": email,
                    "password": TEST_PASSWORD,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

        TestUser {
            id: body["user"]["id"]
                .as_str()
                .and_then(|id| id.parse().ok())
                .expect("user id in response"),
            email,
            token: body["access_token"]
                .as_str()
                .expect("access token in response")
                .to_string(),
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        user: Option<&TestUser>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        send(&self.app, method, uri, user.map(|u| u.auth_header()), body).await
    }
}

/// Sends one request and returns the status with the JSON body (`Null` if
/// the body is not JSON)
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    authorization: Option<String>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("valid request");

    let response = app.clone().oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");

    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}
