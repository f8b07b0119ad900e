//! Consumption-gate checks, in authorization order.
//!
//! Before an external generation job may start, the gate verifies (1) the
//! plan authorizes the requested grade, (2) the assignment quota has room,
//! and (3) the estimated token cost can be debited. The checks here are pure;
//! `scripta-db` re-applies them inside the balance row lock so two concurrent
//! gate passes cannot both read the same stale state.

use crate::error::CoreError;
use crate::plans::{Grade, PlanCatalog, PlanType};

/// Check that a plan authorizes the requested grade.
///
/// Fixed tiers consult the catalog; CUSTOM balances carry their own grade
/// ceiling (the purchased grade authorizes itself and every lower grade).
pub fn check_grade_allowed(
    catalog: &PlanCatalog,
    plan_type: PlanType,
    custom_grade: Option<Grade>,
    requested: Grade,
) -> Result<(), CoreError> {
    let allowed = match (plan_type, custom_grade) {
        (PlanType::Custom, Some(ceiling)) => requested <= ceiling,
        (PlanType::Custom, None) => false,
        _ => catalog.allows_grade(plan_type, requested),
    };

    if allowed {
        Ok(())
    } else {
        Err(CoreError::GradeNotAllowed {
            grade: requested.as_str(),
            plan: plan_type.as_str().to_string(),
        })
    }
}

/// Check the assignment quota for the current period.
///
/// `allowed = None` means the plan has no quota (UNLIMITED).
pub fn check_quota(used: i32, allowed: Option<i32>) -> Result<(), CoreError> {
    match allowed {
        Some(limit) if used >= limit => Err(CoreError::QuotaExhausted {
            used,
            allowed: limit,
        }),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
