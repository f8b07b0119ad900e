//! Consumption-gate handler: the checkpoint the generation pipeline calls
//! before starting a job.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use scripta_core::error::CoreError;
use scripta_core::ledger::validate_amount;
use scripta_core::plans::Grade;
use scripta_db::models::token_balance::ConsumeOutcome;
use scripta_db::models::token_transaction::TokenTransaction;
use scripta_db::repositories::LedgerRepo;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAuth;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AuthorizeRequest {
    /// Requested output grade, e.g. `"MERIT"`.
    pub grade: String,
    /// Estimated token cost of the job.
    pub estimated_tokens: i64,
    /// Optional label for the audit row (e.g. the brief title).
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    pub authorized: bool,
    /// The `ASSIGNMENT_GENERATION` debit recorded for this pass.
    pub transaction: TokenTransaction,
}

/// Authorize one generation job: grade eligibility, assignment quota, then
/// an atomic token debit. A failed check leaves the ledger untouched; a
/// passed gate records exactly one debit. Refunds for downstream failures
/// are an explicit operator decision, never automatic.
pub async fn authorize_generation(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<AuthorizeRequest>,
) -> AppResult<impl IntoResponse> {
    let grade = Grade::parse(&body.grade)?;
    validate_amount(body.estimated_tokens)?;

    let description = body
        .description
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("Assignment generation ({s})"))
        .unwrap_or_else(|| format!("Assignment generation at {}", grade.as_str()));

    let outcome = LedgerRepo::consume(
        &state.pool,
        user.user_id,
        grade,
        body.estimated_tokens,
        &state.catalog,
        &description,
        Utc::now(),
    )
    .await?;

    let txn = match outcome {
        ConsumeOutcome::Authorized(txn) => txn,
        ConsumeOutcome::GradeNotAllowed { plan_type } => {
            return Err(CoreError::GradeNotAllowed {
                grade: grade.as_str(),
                plan: plan_type,
            }
            .into())
        }
        ConsumeOutcome::QuotaExhausted { used, allowed } => {
            return Err(CoreError::QuotaExhausted { used, allowed }.into())
        }
        ConsumeOutcome::Insufficient { available } => {
            return Err(CoreError::InsufficientBalance {
                required: body.estimated_tokens,
                available,
            }
            .into())
        }
        ConsumeOutcome::UserNotFound => {
            return Err(CoreError::NotFound {
                entity: "token_balance",
                id: user.user_id,
            }
            .into())
        }
    };

    tracing::info!(
        user_id = user.user_id,
        grade = grade.as_str(),
        cost = body.estimated_tokens,
        "Generation authorized"
    );
    Ok(Json(DataResponse {
        data: AuthorizeResponse {
            authorized: true,
            transaction: txn,
        },
    }))
}
