//! Handlers for the payment lifecycle: create, read, cancel, settle.
//!
//! All reads apply lazy expiry before returning rows, so an overdue pending
//! payment is observed as `EXPIRED` and can never block a new purchase.
//! Settlement deliberately reads the raw row: the settle/expire race is
//! decided by the repository's compare-and-set, not by the reader.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use scripta_core::error::CoreError;
use scripta_core::pagination::{clamp_limit, clamp_offset};
use scripta_core::payments::{
    expiry_for, validate_payment_method, PaymentStatus, SettleOutcome,
};
use scripta_core::plans::{Grade, PlanCatalog, PlanType};
use scripta_core::pricing::custom_plan_price;
use scripta_core::roles::ROLE_OPERATOR;
use scripta_core::types::DbId;
use scripta_db::models::payment::{CreatePayment, Payment, PlanGrant};
use scripta_db::repositories::PaymentRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireAuth, RequireOperator};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    /// Purchased tier, e.g. `"PM"` or `"CUSTOM"`.
    pub plan_type: String,
    /// One of the accepted payment methods, e.g. `"BANK_TRANSFER"`.
    pub payment_method: String,
    /// Token quantity; CUSTOM purchases only.
    pub custom_tokens: Option<i64>,
    /// Target grade; CUSTOM purchases only.
    pub custom_grade: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SettleRequest {
    /// `"PAID"` or `"REJECTED"`.
    pub outcome: SettleOutcome,
}

/// Pagination query parameters for the payment history endpoint.
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ---------------------------------------------------------------------------
// POST /payments -- create a purchase attempt
// ---------------------------------------------------------------------------

/// Create a new payment in `WAITING_PAYMENT`.
///
/// Fails 409 when a pending payment already exists. The friendly pre-check
/// below is advisory; the authoritative guard is the partial unique index,
/// which turns a create/create race into a 409 as well.
pub async fn create_payment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CreatePaymentRequest>,
) -> AppResult<impl IntoResponse> {
    let plan_type = PlanType::parse(&body.plan_type)?;
    validate_payment_method(&body.payment_method)?;

    let now = Utc::now();

    let (final_amount, custom_tokens, custom_grade) = if plan_type.is_custom() {
        let tokens = body.custom_tokens.ok_or_else(|| {
            CoreError::Validation("custom_tokens is required for CUSTOM purchases".into())
        })?;
        let grade_str = body.custom_grade.as_deref().ok_or_else(|| {
            CoreError::Validation("custom_grade is required for CUSTOM purchases".into())
        })?;
        let grade = Grade::parse(grade_str)?;
        let price = custom_plan_price(tokens, grade)?;
        (price, Some(tokens), Some(grade.as_str().to_string()))
    } else {
        if body.custom_tokens.is_some() || body.custom_grade.is_some() {
            return Err(CoreError::Validation(
                "custom_tokens/custom_grade are only valid for CUSTOM purchases".into(),
            )
            .into());
        }
        let def = state.catalog.purchasable_fixed(plan_type)?;
        (def.price_minor, None, None)
    };

    if PaymentRepo::find_pending_for_user(&state.pool, user.user_id, now)
        .await?
        .is_some()
    {
        return Err(CoreError::Conflict(
            "A pending payment already exists. Cancel it or wait for settlement.".into(),
        )
        .into());
    }

    let input = CreatePayment {
        user_id: user.user_id,
        plan_type: plan_type.as_str().to_string(),
        payment_method: body.payment_method,
        final_amount,
        custom_tokens,
        custom_grade,
        expires_at: expiry_for(now, state.config.payment_window_hours),
    };
    let payment = PaymentRepo::create(&state.pool, &input).await?;

    tracing::info!(
        user_id = user.user_id,
        payment_id = payment.id,
        plan_type = %payment.plan_type,
        amount = payment.final_amount,
        "Payment created"
    );
    Ok(Json(DataResponse { data: payment }))
}

// ---------------------------------------------------------------------------
// GET /payments/active -- the user's pending payment, if any
// ---------------------------------------------------------------------------

/// The authenticated user's pending payment, with lazy expiry applied.
pub async fn get_active_payment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> AppResult<impl IntoResponse> {
    let payment =
        PaymentRepo::find_pending_for_user(&state.pool, user.user_id, Utc::now()).await?;
    Ok(Json(DataResponse { data: payment }))
}

// ---------------------------------------------------------------------------
// GET /payments -- payment history
// ---------------------------------------------------------------------------

/// The authenticated user's payment history, newest first.
pub async fn list_payments(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<PaginationQuery>,
) -> AppResult<impl IntoResponse> {
    let limit = clamp_limit(params.limit, 50, 200);
    let offset = clamp_offset(params.offset);

    let payments =
        PaymentRepo::list_for_user(&state.pool, user.user_id, limit, offset, Utc::now()).await?;
    Ok(Json(DataResponse { data: payments }))
}

// ---------------------------------------------------------------------------
// GET /payments/{id}
// ---------------------------------------------------------------------------

/// Fetch one payment. Members may only read their own; operators may read
/// any (reconciliation view).
pub async fn get_payment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let payment = PaymentRepo::find_fresh(&state.pool, id, Utc::now())
        .await?
        .ok_or(CoreError::NotFound {
            entity: "payment",
            id,
        })?;

    check_ownership(&payment, &user)?;
    Ok(Json(DataResponse { data: payment }))
}

// ---------------------------------------------------------------------------
// POST /payments/{id}/cancel
// ---------------------------------------------------------------------------

/// Cancel a pending payment. Owner only; only while `WAITING_PAYMENT`.
pub async fn cancel_payment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    // Lazy expiry first: an overdue payment must cancel as EXPIRED, not
    // CANCELLED.
    let payment = PaymentRepo::find_fresh(&state.pool, id, Utc::now())
        .await?
        .ok_or(CoreError::NotFound {
            entity: "payment",
            id,
        })?;

    if payment.user_id != user.user_id {
        return Err(
            CoreError::Unauthorized("Only the owner may cancel a payment".into()).into(),
        );
    }
    let status = PaymentStatus::parse(&payment.status)?;
    if status.is_terminal() {
        return Err(invalid_transition(status, "cancelled").into());
    }

    // Compare-and-set; a concurrent settle/expire that wins the race turns
    // this into an invalid-state error rather than a double transition.
    let cancelled = PaymentRepo::cancel(&state.pool, id)
        .await?
        .ok_or_else(|| invalid_transition(status, "cancelled"))?;

    tracing::info!(user_id = user.user_id, payment_id = id, "Payment cancelled");
    Ok(Json(DataResponse { data: cancelled }))
}

// ---------------------------------------------------------------------------
// POST /admin/payments/{id}/settle
// ---------------------------------------------------------------------------

/// Record the reconciliation outcome for a pending payment.
///
/// On `PAID` the owner's balance is upgraded and credited in the same DB
/// transaction as the status flip; re-settling a terminal payment fails with
/// `INVALID_STATE` and never credits twice.
pub async fn settle_payment(
    State(state): State<AppState>,
    RequireOperator(operator): RequireOperator,
    Path(id): Path<DbId>,
    Json(body): Json<SettleRequest>,
) -> AppResult<impl IntoResponse> {
    let now = Utc::now();

    // Raw read, no lazy expiry: if the row is still WAITING_PAYMENT the
    // operator's confirmation wins even when expires_at has lapsed.
    let payment = PaymentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "payment",
            id,
        })?;
    let status = PaymentStatus::parse(&payment.status)?;
    if status.is_terminal() {
        return Err(invalid_transition(status, "settled").into());
    }

    let settled = match body.outcome {
        SettleOutcome::Rejected => PaymentRepo::settle_rejected(&state.pool, id, now).await?,
        SettleOutcome::Paid => {
            let grant = build_grant(&payment, &state.catalog)?;
            PaymentRepo::settle_paid(&state.pool, id, &grant, now).await?
        }
    }
    .ok_or_else(|| invalid_transition(status, "settled"))?;

    tracing::info!(
        operator_id = operator.user_id,
        payment_id = id,
        outcome = ?body.outcome,
        "Payment settled"
    );
    Ok(Json(DataResponse { data: settled }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Members may only touch their own payments; operators may read any.
fn check_ownership(payment: &Payment, user: &AuthUser) -> Result<(), CoreError> {
    if payment.user_id == user.user_id || user.role == ROLE_OPERATOR {
        Ok(())
    } else {
        Err(CoreError::Unauthorized(
            "Payment belongs to another user".into(),
        ))
    }
}

fn invalid_transition(status: PaymentStatus, verb: &str) -> CoreError {
    CoreError::InvalidState(format!(
        "Payment is {} and cannot be {verb}",
        status.as_str()
    ))
}

/// Compute what a PAID settlement grants, from the catalog for fixed tiers
/// or from the purchase itself for CUSTOM.
fn build_grant(payment: &Payment, catalog: &PlanCatalog) -> Result<PlanGrant, CoreError> {
    let plan_type = PlanType::parse(&payment.plan_type)?;

    if plan_type.is_custom() {
        let tokens = payment.custom_tokens.ok_or_else(|| {
            CoreError::Internal(format!(
                "CUSTOM payment {} has no custom_tokens",
                payment.id
            ))
        })?;
        let grade = payment.custom_grade.clone().ok_or_else(|| {
            CoreError::Internal(format!("CUSTOM payment {} has no custom_grade", payment.id))
        })?;
        return Ok(PlanGrant {
            plan_type: payment.plan_type.clone(),
            tokens_per_month: tokens,
            tokens_granted: tokens,
            custom_grade: Some(grade),
            unlimited: false,
            description: format!("Plan upgrade to CUSTOM ({tokens} tokens)"),
        });
    }

    let def = catalog
        .definition(plan_type)
        .ok_or_else(|| CoreError::Internal(format!("Plan {} not in catalog", payment.plan_type)))?;
    Ok(PlanGrant {
        plan_type: payment.plan_type.clone(),
        tokens_per_month: def.tokens_per_month,
        tokens_granted: def.tokens_per_month,
        custom_grade: None,
        unlimited: plan_type.is_unlimited(),
        description: format!("Plan upgrade to {}", def.name),
    })
}
