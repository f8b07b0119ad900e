//! Handlers for token balance, ledger history, and operator adjustments.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use scripta_core::error::CoreError;
use scripta_core::ledger::{validate_amount, TxnKind};
use scripta_core::pagination::{clamp_limit, clamp_offset};
use scripta_core::types::DbId;
use scripta_db::models::token_balance::{DebitOutcome, ResetOutcome};
use scripta_db::models::token_transaction::TokenTransaction;
use scripta_db::repositories::LedgerRepo;

use crate::error::AppResult;
use crate::middleware::rbac::{RequireAuth, RequireOperator};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query / request types
// ---------------------------------------------------------------------------

/// Pagination query parameters for the history endpoint.
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Direction of an operator adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustDirection {
    Credit,
    Debit,
}

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub direction: AdjustDirection,
    /// Positive token magnitude; the direction determines the sign.
    pub amount: i64,
    /// Audit description, e.g. the refund reason.
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    /// Whether a reset was actually due and applied.
    pub applied: bool,
    pub transaction: Option<TokenTransaction>,
}

// ---------------------------------------------------------------------------
// GET /tokens/balance
// ---------------------------------------------------------------------------

/// Current balance for the authenticated user, with a due monthly reset
/// applied first (lazy, no scheduler).
pub async fn get_balance(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> AppResult<impl IntoResponse> {
    let balance = LedgerRepo::balance_fresh(&state.pool, user.user_id, Utc::now())
        .await?
        .ok_or(CoreError::NotFound {
            entity: "token_balance",
            id: user.user_id,
        })?;

    Ok(Json(DataResponse { data: balance }))
}

// ---------------------------------------------------------------------------
// GET /tokens/history
// ---------------------------------------------------------------------------

/// Ledger history for the authenticated user, newest first.
pub async fn list_history(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<PaginationQuery>,
) -> AppResult<impl IntoResponse> {
    let limit = clamp_limit(params.limit, 50, 200);
    let offset = clamp_offset(params.offset);

    let transactions = LedgerRepo::history(&state.pool, user.user_id, limit, offset).await?;
    Ok(Json(DataResponse { data: transactions }))
}

// ---------------------------------------------------------------------------
// POST /admin/tokens/{user_id}/adjust
// ---------------------------------------------------------------------------

/// Operator-initiated manual adjustment (e.g. a refund after a failed
/// downstream job). Writes one `ADMIN_ADJUSTMENT` audit row.
pub async fn adjust_balance(
    State(state): State<AppState>,
    RequireOperator(operator): RequireOperator,
    Path(user_id): Path<DbId>,
    Json(body): Json<AdjustRequest>,
) -> AppResult<impl IntoResponse> {
    validate_amount(body.amount)?;
    if body.description.trim().is_empty() {
        return Err(CoreError::Validation("An audit description is required".into()).into());
    }

    let now = Utc::now();
    let txn = match body.direction {
        AdjustDirection::Credit => {
            LedgerRepo::credit(
                &state.pool,
                user_id,
                body.amount,
                TxnKind::AdminAdjustment,
                body.description.trim(),
                now,
            )
            .await?
            .ok_or(CoreError::NotFound {
                entity: "token_balance",
                id: user_id,
            })?
        }
        AdjustDirection::Debit => {
            match LedgerRepo::debit(
                &state.pool,
                user_id,
                body.amount,
                TxnKind::AdminAdjustment,
                body.description.trim(),
                now,
            )
            .await?
            {
                DebitOutcome::Applied(txn) => txn,
                DebitOutcome::Insufficient { available } => {
                    return Err(CoreError::InsufficientBalance {
                        required: body.amount,
                        available,
                    }
                    .into())
                }
                DebitOutcome::UserNotFound => {
                    return Err(CoreError::NotFound {
                        entity: "token_balance",
                        id: user_id,
                    }
                    .into())
                }
            }
        }
    };

    tracing::info!(
        operator_id = operator.user_id,
        user_id,
        amount = body.amount,
        direction = ?body.direction,
        "Manual balance adjustment applied"
    );
    Ok(Json(DataResponse { data: txn }))
}

// ---------------------------------------------------------------------------
// POST /admin/tokens/{user_id}/reset
// ---------------------------------------------------------------------------

/// Operator-triggered monthly reset. Idempotent per period: a reset that is
/// not yet due reports `applied: false` and changes nothing.
pub async fn reset_balance(
    State(state): State<AppState>,
    RequireOperator(_operator): RequireOperator,
    Path(user_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let data = match LedgerRepo::reset_if_due(&state.pool, user_id, Utc::now()).await? {
        ResetOutcome::Applied(txn) => ResetResponse {
            applied: true,
            transaction: Some(txn),
        },
        ResetOutcome::NotDue => ResetResponse {
            applied: false,
            transaction: None,
        },
        ResetOutcome::UserNotFound => {
            return Err(CoreError::NotFound {
                entity: "token_balance",
                id: user_id,
            }
            .into())
        }
    };

    Ok(Json(DataResponse { data }))
}
