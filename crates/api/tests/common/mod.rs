//! Shared fixtures for API integration tests.
//!
//! Mirrors the production router construction via
//! [`scripta_api::router::build_app_router`] so tests exercise the same
//! middleware stack (CORS, request ID, timeout, tracing, panic recovery)
//! that production uses.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

use scripta_api::auth::jwt::{generate_access_token, JwtConfig};
use scripta_api::config::ServerConfig;
use scripta_api::router::build_app_router;
use scripta_api::state::AppState;
use scripta_core::plans::PlanCatalog;
use scripta_core::types::DbId;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        payment_window_hours: 24,
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_token_expiry_mins: 60,
        },
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        catalog: Arc::new(PlanCatalog::standard()),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Send a request with optional bearer token and JSON body.
pub async fn request(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    request(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    request(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(
    app: Router,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> Response<Body> {
    request(app, Method::POST, uri, token, Some(body)).await
}

/// Read a response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Account fixtures
// ---------------------------------------------------------------------------

/// An authenticated account created through the real signup endpoint.
pub struct TestAccount {
    pub user_id: DbId,
    pub token: String,
}

/// Sign up a member through the API and return their id and access token.
pub async fn signup_member(app: &Router, username: &str) -> TestAccount {
    let response = post_json(
        app.clone(),
        "/api/v1/auth/signup",
        None,
        json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "a-strong-password",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK, "signup must succeed");

    let body = body_json(response).await;
    TestAccount {
        user_id: body["data"]["user"]["id"].as_i64().unwrap(),
        token: body["data"]["access_token"].as_str().unwrap().to_string(),
    }
}

/// Promote a user to operator and mint a matching token.
pub async fn promote_to_operator(pool: &PgPool, account: &TestAccount) -> String {
    sqlx::query("UPDATE users SET role = 'operator' WHERE id = $1")
        .bind(account.user_id)
        .execute(pool)
        .await
        .expect("promote to operator");
    generate_access_token(account.user_id, "operator", &test_config().jwt)
        .expect("mint operator token")
}

/// Overwrite a user's balance row for scenario setup.
pub async fn set_balance(
    pool: &PgPool,
    user_id: DbId,
    plan_type: &str,
    tokens_remaining: i64,
    tokens_per_month: i64,
) {
    sqlx::query(
        "UPDATE token_balances
         SET plan_type = $2, tokens_remaining = $3, tokens_per_month = $4
         WHERE user_id = $1",
    )
    .bind(user_id)
    .bind(plan_type)
    .bind(tokens_remaining)
    .bind(tokens_per_month)
    .execute(pool)
    .await
    .expect("set balance");
}

/// Fetch `tokens_remaining` directly.
pub async fn remaining(pool: &PgPool, user_id: DbId) -> i64 {
    let row: (i64,) =
        sqlx::query_as("SELECT tokens_remaining FROM token_balances WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .expect("read balance");
    row.0
}
