//! Pure domain logic for the Scripta token ledger and payment core.
//!
//! This crate has no I/O: it defines the plan catalog, custom-tier pricing,
//! the payment lifecycle state machine, token-ledger arithmetic, and the
//! consumption-gate checks. The `scripta-db` crate persists these semantics;
//! the `scripta-api` crate exposes them over HTTP.

pub mod error;
pub mod gate;
pub mod ledger;
pub mod pagination;
pub mod payments;
pub mod plans;
pub mod pricing;
pub mod roles;
pub mod types;
