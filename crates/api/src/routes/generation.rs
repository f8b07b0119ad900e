//! Route definitions for the consumption gate.

use axum::routing::post;
use axum::Router;

use crate::handlers::generation;
use crate::state::AppState;

/// Generation routes mounted at `/generation`.
///
/// ```text
/// POST /authorize         -> authorize_generation
/// ```
pub fn generation_router() -> Router<AppState> {
    Router::new().route("/authorize", post(generation::authorize_generation))
}
