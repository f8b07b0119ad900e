//! Payment transaction model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use scripta_core::types::{DbId, Timestamp};

/// A purchase attempt row from the `payments` table.
///
/// Owned exclusively by `user_id` while in `WAITING_PAYMENT`; terminal rows
/// are immutable history.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Payment {
    pub id: DbId,
    pub user_id: DbId,
    pub plan_type: String,
    pub payment_method: String,
    /// Price in minor currency units.
    pub final_amount: i64,
    pub status: String,
    /// Requested token quantity; CUSTOM purchases only.
    pub custom_tokens: Option<i64>,
    /// Target grade ceiling; CUSTOM purchases only.
    pub custom_grade: Option<String>,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub settled_at: Option<Timestamp>,
}

/// Insert input for a new payment, priced and validated by the caller.
#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub user_id: DbId,
    pub plan_type: String,
    pub payment_method: String,
    pub final_amount: i64,
    pub custom_tokens: Option<i64>,
    pub custom_grade: Option<String>,
    pub expires_at: Timestamp,
}

/// What a PAID settlement applies to the owner's balance, computed by the
/// caller from the catalog (fixed tiers) or the purchase itself (custom).
#[derive(Debug, Clone)]
pub struct PlanGrant {
    pub plan_type: String,
    /// New monthly quota. Zero for UNLIMITED.
    pub tokens_per_month: i64,
    /// Tokens credited on top of the current balance. Zero for UNLIMITED.
    pub tokens_granted: i64,
    /// Grade ceiling to record; CUSTOM grants only.
    pub custom_grade: Option<String>,
    /// UNLIMITED grants pin the stored balance to zero instead of crediting.
    pub unlimited: bool,
    /// Human-readable audit description for the `PLAN_UPGRADE` row.
    pub description: String,
}
