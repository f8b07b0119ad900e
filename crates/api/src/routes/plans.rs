//! Route definitions for the plan catalog.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::plans;
use crate::state::AppState;

/// Plan catalog routes mounted at `/plans`.
///
/// ```text
/// GET  /                  -> list_plans
/// POST /custom/quote      -> quote_custom
/// ```
pub fn plans_router() -> Router<AppState> {
    Router::new()
        .route("/", get(plans::list_plans))
        .route("/custom/quote", post(plans::quote_custom))
}
