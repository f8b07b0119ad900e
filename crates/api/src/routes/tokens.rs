//! Route definitions for token balance and ledger history.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::tokens;
use crate::state::AppState;

/// Token routes mounted at `/tokens`.
///
/// ```text
/// GET /balance            -> get_balance
/// GET /history            -> list_history
/// ```
pub fn tokens_router() -> Router<AppState> {
    Router::new()
        .route("/balance", get(tokens::get_balance))
        .route("/history", get(tokens::list_history))
}

/// Operator token routes mounted at `/admin/tokens`.
///
/// ```text
/// POST /{user_id}/adjust  -> adjust_balance (operator only)
/// POST /{user_id}/reset   -> reset_balance (operator only)
/// ```
pub fn admin_tokens_router() -> Router<AppState> {
    Router::new()
        .route("/{user_id}/adjust", post(tokens::adjust_balance))
        .route("/{user_id}/reset", post(tokens::reset_balance))
}
