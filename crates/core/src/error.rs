use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Insufficient balance: {required} tokens required, {available} available")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("Grade {grade} is not allowed on plan {plan}")]
    GradeNotAllowed { grade: &'static str, plan: String },

    #[error("Assignment quota exhausted: {used} of {allowed} used this period")]
    QuotaExhausted { used: i32, allowed: i32 },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
