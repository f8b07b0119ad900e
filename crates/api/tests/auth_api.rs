//! Integration tests for signup and login.

mod common;

use axum::http::StatusCode;
use common::{body_json, get_auth, post_json, signup_member};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn signup_provisions_a_free_balance(pool: PgPool) {
    let app = common::build_test_app(pool);
    let account = signup_member(&app, "fresh_member").await;

    let response = get_auth(app, "/api/v1/tokens/balance", &account.token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["plan_type"], "FREE");
    assert_eq!(json["data"]["tokens_remaining"], 5_000);
    assert_eq!(json["data"]["tokens_per_month"], 5_000);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_username_is_a_conflict(pool: PgPool) {
    let app = common::build_test_app(pool);
    signup_member(&app, "taken_name").await;

    let response = post_json(
        app,
        "/api/v1/auth/signup",
        None,
        json!({
            "username": "taken_name",
            "email": "other@example.com",
            "password": "a-strong-password",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = body_json(response).await;
    assert_eq!(json["code"], "CONFLICT");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn short_password_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/auth/signup",
        None,
        json!({
            "username": "weak_pw",
            "email": "weak@example.com",
            "password": "short",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_roundtrip(pool: PgPool) {
    let app = common::build_test_app(pool);
    signup_member(&app, "login_user").await;

    let response = post_json(
        app.clone(),
        "/api/v1/auth/login",
        None,
        json!({ "username": "login_user", "password": "a-strong-password" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["data"]["access_token"].is_string());
    assert_eq!(json["data"]["user"]["role"], "member");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn wrong_password_is_unauthorized(pool: PgPool) {
    let app = common::build_test_app(pool);
    signup_member(&app, "forgetful").await;

    let response = post_json(
        app,
        "/api/v1/auth/login",
        None,
        json!({ "username": "forgetful", "password": "not-my-password" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn protected_routes_require_a_token(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = common::get(app, "/api/v1/tokens/balance").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
