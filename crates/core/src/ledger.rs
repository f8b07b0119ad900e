//! Token-ledger constants and pure arithmetic.
//!
//! The ledger itself (balance row + append-only transaction rows) lives in
//! `scripta-db`; this module defines the transaction kinds, the monthly reset
//! schedule, and the reset arithmetic the repository applies under its row
//! lock.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Transaction kinds
// ---------------------------------------------------------------------------

/// Kind of a ledger transaction. One row is written per balance mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxnKind {
    AssignmentGeneration,
    PlanUpgrade,
    AdminAdjustment,
    MonthlyReset,
}

impl TxnKind {
    /// Wire/storage representation (persisted fields are bit-exact).
    pub fn as_str(self) -> &'static str {
        match self {
            TxnKind::AssignmentGeneration => "ASSIGNMENT_GENERATION",
            TxnKind::PlanUpgrade => "PLAN_UPGRADE",
            TxnKind::AdminAdjustment => "ADMIN_ADJUSTMENT",
            TxnKind::MonthlyReset => "MONTHLY_RESET",
        }
    }

    /// Parse a wire/storage string into a transaction kind.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "ASSIGNMENT_GENERATION" => Ok(TxnKind::AssignmentGeneration),
            "PLAN_UPGRADE" => Ok(TxnKind::PlanUpgrade),
            "ADMIN_ADJUSTMENT" => Ok(TxnKind::AdminAdjustment),
            "MONTHLY_RESET" => Ok(TxnKind::MonthlyReset),
            other => Err(CoreError::Validation(format!(
                "Unknown transaction kind '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Reset schedule
// ---------------------------------------------------------------------------

/// Length of one quota period.
pub const RESET_PERIOD_DAYS: i64 = 30;

/// Whether a balance's monthly reset is due.
///
/// Applied lazily on reads: there is no scheduler, so any read path that
/// observes a due balance applies the reset first. Calling this twice in the
/// same period yields `false` the second time because the applied reset
/// advances `next_reset_at`.
pub fn is_reset_due(next_reset_at: Timestamp, now: Timestamp) -> bool {
    now >= next_reset_at
}

/// The `next_reset_at` value after applying a reset at `now`.
pub fn next_reset_from(now: Timestamp) -> Timestamp {
    now + Duration::days(RESET_PERIOD_DAYS)
}

/// Net balance change recorded by a reset.
///
/// Reset is an assignment, not an addition: unused tokens are forfeited, so
/// the recorded amount may be negative (carryover discarded) or positive
/// (quota refilled).
pub fn reset_net_change(tokens_remaining: i64, tokens_per_month: i64) -> i64 {
    tokens_per_month - tokens_remaining
}

// ---------------------------------------------------------------------------
// Amount validation
// ---------------------------------------------------------------------------

/// Validate a credit/debit amount. Ledger mutations always take a positive
/// magnitude; the sign is determined by the operation.
pub fn validate_amount(amount: i64) -> Result<(), CoreError> {
    if amount <= 0 {
        return Err(CoreError::Validation(format!(
            "Ledger amounts must be positive, got {amount}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
