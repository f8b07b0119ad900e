//! Route definitions for the payment lifecycle.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::payments;
use crate::state::AppState;

/// Payment routes mounted at `/payments`.
///
/// ```text
/// POST /                  -> create_payment
/// GET  /                  -> list_payments
/// GET  /active            -> get_active_payment
/// GET  /{id}              -> get_payment
/// POST /{id}/cancel       -> cancel_payment
/// ```
pub fn payments_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(payments::create_payment).get(payments::list_payments),
        )
        .route("/active", get(payments::get_active_payment))
        .route("/{id}", get(payments::get_payment))
        .route("/{id}/cancel", post(payments::cancel_payment))
}

/// Operator payment routes mounted at `/admin/payments`.
///
/// ```text
/// POST /{id}/settle       -> settle_payment (operator only)
/// ```
pub fn admin_payments_router() -> Router<AppState> {
    Router::new().route("/{id}/settle", post(payments::settle_payment))
}
