//! Payment lifecycle state machine and validation.
//!
//! A payment starts in `WAITING_PAYMENT` and ends in exactly one terminal
//! state. Transfers happen outside the system (manual bank reconciliation),
//! so the only transitions are: the owner cancels, the window lapses
//! (enforced lazily on read), or an operator settles as PAID/REJECTED.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Payment lifecycle status. Stored as TEXT; wire strings are bit-exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    WaitingPayment,
    Paid,
    Rejected,
    Expired,
    Cancelled,
}

impl PaymentStatus {
    /// Wire/storage representation (persisted fields are bit-exact).
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::WaitingPayment => "WAITING_PAYMENT",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Rejected => "REJECTED",
            PaymentStatus::Expired => "EXPIRED",
            PaymentStatus::Cancelled => "CANCELLED",
        }
    }

    /// Parse a wire/storage string into a status.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "WAITING_PAYMENT" => Ok(PaymentStatus::WaitingPayment),
            "PAID" => Ok(PaymentStatus::Paid),
            "REJECTED" => Ok(PaymentStatus::Rejected),
            "EXPIRED" => Ok(PaymentStatus::Expired),
            "CANCELLED" => Ok(PaymentStatus::Cancelled),
            other => Err(CoreError::Validation(format!(
                "Unknown payment status '{other}'"
            ))),
        }
    }

    /// Every status except `WAITING_PAYMENT` is terminal.
    pub fn is_terminal(self) -> bool {
        !matches!(self, PaymentStatus::WaitingPayment)
    }
}

/// Settlement outcomes an operator may record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettleOutcome {
    Paid,
    Rejected,
}

impl SettleOutcome {
    pub fn as_status(self) -> PaymentStatus {
        match self {
            SettleOutcome::Paid => PaymentStatus::Paid,
            SettleOutcome::Rejected => PaymentStatus::Rejected,
        }
    }
}

// ---------------------------------------------------------------------------
// Payment methods
// ---------------------------------------------------------------------------

/// Manual bank transfer, reconciled by an operator.
pub const METHOD_BANK_TRANSFER: &str = "BANK_TRANSFER";

/// E-wallet transfer, reconciled by an operator.
pub const METHOD_EWALLET: &str = "EWALLET";

/// All valid payment methods.
pub const VALID_PAYMENT_METHODS: &[&str] = &[METHOD_BANK_TRANSFER, METHOD_EWALLET];

/// Validate that a payment method string is one of the accepted values.
pub fn validate_payment_method(method: &str) -> Result<(), CoreError> {
    if VALID_PAYMENT_METHODS.contains(&method) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid payment method '{method}'. Must be one of: {}",
            VALID_PAYMENT_METHODS.join(", ")
        )))
    }
}

// ---------------------------------------------------------------------------
// Expiry window
// ---------------------------------------------------------------------------

/// Default payment window in hours (overridable via `PAYMENT_WINDOW_HOURS`).
pub const DEFAULT_PAYMENT_WINDOW_HOURS: i64 = 24;

/// The `expires_at` for a payment created at `created_at`.
pub fn expiry_for(created_at: Timestamp, window_hours: i64) -> Timestamp {
    created_at + Duration::hours(window_hours)
}

/// The status a reader must observe, applying lazy expiry.
///
/// An overdue `WAITING_PAYMENT` reads as `EXPIRED`; read paths persist this
/// transition before returning the row, so the "at most one pending"
/// invariant self-heals without a timer process. Terminal statuses are never
/// reinterpreted -- expiry is not applied retroactively to a settled payment.
pub fn effective_status(
    status: PaymentStatus,
    expires_at: Timestamp,
    now: Timestamp,
) -> PaymentStatus {
    if status == PaymentStatus::WaitingPayment && now >= expires_at {
        PaymentStatus::Expired
    } else {
        status
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
