//! Immutable ledger transaction model.

use serde::Serialize;
use sqlx::FromRow;
use scripta_core::types::{DbId, Timestamp};

/// An append-only audit row from the `token_transactions` table.
///
/// Created exactly once per ledger mutation, in the same DB transaction as
/// the balance change; never mutated or deleted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TokenTransaction {
    pub id: DbId,
    pub user_id: DbId,
    /// One of `ASSIGNMENT_GENERATION`, `PLAN_UPGRADE`, `ADMIN_ADJUSTMENT`,
    /// `MONTHLY_RESET`.
    pub kind: String,
    /// Signed token delta: negative = debit, positive = credit.
    pub amount: i64,
    pub description: String,
    pub created_at: Timestamp,
}
