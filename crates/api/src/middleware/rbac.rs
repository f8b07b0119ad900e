//! Role-based access control extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose role does
//! not meet the minimum requirement.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use scripta_core::error::CoreError;
use scripta_core::roles::ROLE_OPERATOR;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `operator` role (settlement and manual adjustments).
/// Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn settle(RequireOperator(user): RequireOperator) -> AppResult<Json<()>> {
///     // user is guaranteed to be an operator here
///     Ok(Json(()))
/// }
/// ```
pub struct RequireOperator(pub AuthUser);

impl FromRequestParts<AppState> for RequireOperator {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_OPERATOR {
            return Err(AppError::Core(CoreError::Forbidden(
                "Operator role required".into(),
            )));
        }
        Ok(RequireOperator(user))
    }
}

/// Requires any authenticated user (any valid role).
///
/// Functionally equivalent to [`AuthUser`] but named explicitly for use in
/// route definitions where the intent "this route requires authentication"
/// should be self-documenting.
pub struct RequireAuth(pub AuthUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        Ok(RequireAuth(user))
    }
}
