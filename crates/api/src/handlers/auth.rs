//! Handlers for signup and login.
//!
//! Signup provisions the FREE-tier token balance in the same transaction as
//! the user row, so every authenticated caller of the token endpoints has a
//! balance. Operators are provisioned out of band.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use scripta_core::error::CoreError;
use scripta_core::plans::PlanType;
use scripta_core::roles::ROLE_MEMBER;
use scripta_db::models::user::{CreateUser, User, UserResponse};
use scripta_db::repositories::UserRepo;

use crate::auth::jwt::generate_access_token;
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Authenticated session payload returned by signup and login.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: UserResponse,
    pub access_token: String,
}

fn session_response(user: User, state: &AppState) -> AppResult<SessionResponse> {
    let access_token = generate_access_token(user.id, &user.role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Failed to sign access token: {e}")))?;
    Ok(SessionResponse {
        user: user.into(),
        access_token,
    })
}

// ---------------------------------------------------------------------------
// POST /auth/signup
// ---------------------------------------------------------------------------

/// Register a new member and provision their FREE-tier balance.
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> AppResult<impl IntoResponse> {
    if body.username.trim().is_empty() || body.email.trim().is_empty() {
        return Err(CoreError::Validation("username and email are required".into()).into());
    }
    validate_password_strength(&body.password).map_err(CoreError::Validation)?;

    let password_hash = hash_password(&body.password)
        .map_err(|e| AppError::InternalError(format!("Failed to hash password: {e}")))?;

    let free_tokens = state
        .catalog
        .definition(PlanType::Free)
        .map(|def| def.tokens_per_month)
        .unwrap_or(0);

    let input = CreateUser {
        username: body.username.trim().to_string(),
        email: body.email.trim().to_string(),
        password_hash,
        role: ROLE_MEMBER.to_string(),
    };
    // Duplicate username/email surfaces as 409 via the uq_users_* indexes.
    let user = UserRepo::create(&state.pool, &input, free_tokens, Utc::now()).await?;

    tracing::info!(user_id = user.id, "New member signed up");
    Ok(Json(DataResponse {
        data: session_response(user, &state)?,
    }))
}

// ---------------------------------------------------------------------------
// POST /auth/login
// ---------------------------------------------------------------------------

/// Authenticate a user and issue an access token.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let user = UserRepo::find_by_username(&state.pool, &body.username)
        .await?
        .ok_or_else(|| CoreError::Unauthorized("Invalid username or password".into()))?;

    if !user.is_active {
        return Err(CoreError::Forbidden("Account is deactivated".into()).into());
    }

    let valid = verify_password(&body.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification failed: {e}")))?;
    if !valid {
        return Err(CoreError::Unauthorized("Invalid username or password".into()).into());
    }

    Ok(Json(DataResponse {
        data: session_response(user, &state)?,
    }))
}
