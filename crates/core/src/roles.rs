//! Well-known role name constants.
//!
//! These must match the seed data in `db/migrations/0001_create_users.sql`.

/// Regular platform user: owns a token balance, creates and cancels payments.
pub const ROLE_MEMBER: &str = "member";

/// Reconciliation operator: settles payments and applies manual ledger
/// adjustments on top of everything a member can do.
pub const ROLE_OPERATOR: &str = "operator";
