//! Token balance model and ledger-operation outcomes.

use serde::Serialize;
use sqlx::FromRow;
use scripta_core::types::{DbId, Timestamp};

use crate::models::token_transaction::TokenTransaction;

/// A user's balance row from the `token_balances` table.
///
/// Exactly one row per user, created at signup. Mutated only by
/// [`crate::repositories::LedgerRepo`] and the settlement path of
/// [`crate::repositories::PaymentRepo`], always under a row lock.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TokenBalance {
    pub user_id: DbId,
    pub tokens_remaining: i64,
    pub tokens_per_month: i64,
    pub plan_type: String,
    /// Grade ceiling recorded when a CUSTOM purchase settled; `None` on
    /// every other plan type.
    pub custom_grade: Option<String>,
    pub assignments_used: i32,
    pub next_reset_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Outcome of a ledger debit.
#[derive(Debug)]
pub enum DebitOutcome {
    /// Debit applied; the audit row written in the same transaction.
    Applied(TokenTransaction),
    /// Balance too low and the plan is not UNLIMITED. Nothing was written.
    Insufficient { available: i64 },
    /// No balance row for this user. Nothing was written.
    UserNotFound,
}

/// Outcome of a lazy monthly reset attempt.
#[derive(Debug)]
pub enum ResetOutcome {
    /// Reset applied; the `MONTHLY_RESET` audit row records the net change.
    Applied(TokenTransaction),
    /// `next_reset_at` is still in the future; nothing was written.
    NotDue,
    /// No balance row for this user.
    UserNotFound,
}

/// Outcome of a consumption-gate pass.
///
/// Mirrors the gate's check order: grade, quota, balance. Every variant
/// except `Authorized` leaves the ledger untouched.
#[derive(Debug)]
pub enum ConsumeOutcome {
    /// All checks passed; exactly one `ASSIGNMENT_GENERATION` row written.
    Authorized(TokenTransaction),
    /// The active plan does not authorize the requested grade.
    GradeNotAllowed { plan_type: String },
    /// The assignment quota for the current period is used up.
    QuotaExhausted { used: i32, allowed: i32 },
    /// The estimated cost exceeds the remaining balance.
    Insufficient { available: i64 },
    /// No balance row for this user.
    UserNotFound,
}
