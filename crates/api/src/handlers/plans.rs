//! Handlers for the plan catalog and custom-tier price quotes.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use scripta_core::plans::Grade;
use scripta_core::pricing::{custom_plan_price, min_tokens_for};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /plans -- catalog for display
// ---------------------------------------------------------------------------

/// List all purchasable tiers.
pub async fn list_plans(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    Ok(Json(DataResponse {
        data: state.catalog.list().to_vec(),
    }))
}

// ---------------------------------------------------------------------------
// POST /plans/custom/quote -- price a custom purchase
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub tokens: i64,
    /// Target grade, e.g. `"DISTINCTION"`.
    pub grade: String,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub tokens: i64,
    pub grade: Grade,
    /// Price in minor currency units.
    pub price: i64,
    /// The minimum quantity for this grade, for form hints.
    pub min_tokens: i64,
}

/// Quote the price of a custom purchase. Pure catalog math, no persistence.
pub async fn quote_custom(Json(body): Json<QuoteRequest>) -> AppResult<impl IntoResponse> {
    let grade = Grade::parse(&body.grade)?;
    let price = custom_plan_price(body.tokens, grade)?;

    Ok(Json(DataResponse {
        data: QuoteResponse {
            tokens: body.tokens,
            grade,
            price,
            min_tokens: min_tokens_for(grade),
        },
    }))
}
