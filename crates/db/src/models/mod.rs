//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` create DTOs for inserts
//! - Operation outcome enums returned by the repository layer

pub mod payment;
pub mod token_balance;
pub mod token_transaction;
pub mod user;
