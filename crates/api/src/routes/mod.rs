pub mod auth;
pub mod generation;
pub mod health;
pub mod payments;
pub mod plans;
pub mod tokens;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/signup                                     signup (public)
/// /auth/login                                      login (public)
///
/// /plans                                           catalog (public)
/// /plans/custom/quote                              custom price quote (public)
///
/// /tokens/balance                                  current balance (auth)
/// /tokens/history                                  ledger history (auth)
///
/// /payments                                        create, history (auth)
/// /payments/active                                 pending payment (auth)
/// /payments/{id}                                   detail (owner/operator)
/// /payments/{id}/cancel                            cancel (owner)
///
/// /generation/authorize                            consumption gate (auth)
///
/// /admin/tokens/{user_id}/adjust                   manual adjustment (operator)
/// /admin/tokens/{user_id}/reset                    monthly reset (operator)
/// /admin/payments/{id}/settle                      settlement (operator)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::auth_router())
        .nest("/plans", plans::plans_router())
        .nest("/tokens", tokens::tokens_router())
        .nest("/payments", payments::payments_router())
        .nest("/generation", generation::generation_router())
        .nest("/admin/tokens", tokens::admin_tokens_router())
        .nest("/admin/payments", payments::admin_payments_router())
}
