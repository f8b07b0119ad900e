//! Plan catalog: purchasable tiers, output grades, and per-tier entitlements.
//!
//! The catalog is immutable configuration data. It is constructed once at
//! process start ([`PlanCatalog::standard`]) and passed by reference to the
//! pricing calculator and the payment manager, never consulted as ambient
//! global state.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Grades
// ---------------------------------------------------------------------------

/// Target output grade for a generation job.
///
/// Ordered: `Pass < Merit < Distinction`. A plan that authorizes a grade
/// implicitly authorizes everything below it only where the catalog says so;
/// custom purchases authorize the purchased grade and all lower grades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Grade {
    Pass,
    Merit,
    Distinction,
}

impl Grade {
    /// Wire/storage representation (persisted fields are bit-exact).
    pub fn as_str(self) -> &'static str {
        match self {
            Grade::Pass => "PASS",
            Grade::Merit => "MERIT",
            Grade::Distinction => "DISTINCTION",
        }
    }

    /// Parse a wire/storage string into a grade.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "PASS" => Ok(Grade::Pass),
            "MERIT" => Ok(Grade::Merit),
            "DISTINCTION" => Ok(Grade::Distinction),
            other => Err(CoreError::Validation(format!(
                "Unknown grade '{other}'. Must be one of: PASS, MERIT, DISTINCTION"
            ))),
        }
    }
}

/// All grades, lowest first.
pub const ALL_GRADES: &[Grade] = &[Grade::Pass, Grade::Merit, Grade::Distinction];

// ---------------------------------------------------------------------------
// Plan types
// ---------------------------------------------------------------------------

/// Purchasable plan tier.
///
/// `Custom` is the priced-by-quantity sentinel: its token allotment, grade
/// ceiling, and price come from the purchase itself rather than the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanType {
    Free,
    P,
    Pm,
    Pmd,
    Unlimited,
    Custom,
}

impl PlanType {
    /// Wire/storage representation (persisted fields are bit-exact).
    pub fn as_str(self) -> &'static str {
        match self {
            PlanType::Free => "FREE",
            PlanType::P => "P",
            PlanType::Pm => "PM",
            PlanType::Pmd => "PMD",
            PlanType::Unlimited => "UNLIMITED",
            PlanType::Custom => "CUSTOM",
        }
    }

    /// Parse a wire/storage string into a plan type.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "FREE" => Ok(PlanType::Free),
            "P" => Ok(PlanType::P),
            "PM" => Ok(PlanType::Pm),
            "PMD" => Ok(PlanType::Pmd),
            "UNLIMITED" => Ok(PlanType::Unlimited),
            "CUSTOM" => Ok(PlanType::Custom),
            other => Err(CoreError::Validation(format!(
                "Unknown plan type '{other}'. Must be one of: FREE, P, PM, PMD, UNLIMITED, CUSTOM"
            ))),
        }
    }

    /// Whether balances on this plan skip all numeric token checks.
    pub fn is_unlimited(self) -> bool {
        matches!(self, PlanType::Unlimited)
    }

    /// Whether this is the priced-by-quantity custom tier.
    pub fn is_custom(self) -> bool {
        matches!(self, PlanType::Custom)
    }
}

// ---------------------------------------------------------------------------
// Catalog entries
// ---------------------------------------------------------------------------

/// One catalog entry describing a purchasable tier.
#[derive(Debug, Clone, Serialize)]
pub struct PlanDefinition {
    pub plan_type: PlanType,
    pub name: &'static str,
    /// Price in minor currency units. Zero for FREE and for the CUSTOM
    /// sentinel (custom prices come from the pricing calculator).
    pub price_minor: i64,
    /// Monthly token allotment. Zero for UNLIMITED (untracked) and for the
    /// CUSTOM sentinel (allotment equals the purchased quantity).
    pub tokens_per_month: i64,
    /// Validity window of a purchase of this tier.
    pub duration_days: i64,
    /// Generation jobs allowed per period. `None` = unlimited.
    pub assignments_allowed: Option<i32>,
    /// Grades this tier authorizes. Empty for CUSTOM (derived per purchase).
    pub allowed_grades: &'static [Grade],
    pub is_custom: bool,
}

/// Assignment quota granted by any custom purchase.
pub const CUSTOM_ASSIGNMENTS_ALLOWED: i32 = 10;

const PASS_ONLY: &[Grade] = &[Grade::Pass];
const PASS_MERIT: &[Grade] = &[Grade::Pass, Grade::Merit];

const STANDARD_PLANS: &[PlanDefinition] = &[
    PlanDefinition {
        plan_type: PlanType::Free,
        name: "Free",
        price_minor: 0,
        tokens_per_month: 5_000,
        duration_days: 30,
        assignments_allowed: Some(1),
        allowed_grades: PASS_ONLY,
        is_custom: false,
    },
    PlanDefinition {
        plan_type: PlanType::P,
        name: "Pass",
        price_minor: 25_000,
        tokens_per_month: 75_000,
        duration_days: 30,
        assignments_allowed: Some(5),
        allowed_grades: PASS_ONLY,
        is_custom: false,
    },
    PlanDefinition {
        plan_type: PlanType::Pm,
        name: "Pass + Merit",
        price_minor: 50_000,
        tokens_per_month: 150_000,
        duration_days: 30,
        assignments_allowed: Some(10),
        allowed_grades: PASS_MERIT,
        is_custom: false,
    },
    PlanDefinition {
        plan_type: PlanType::Pmd,
        name: "All grades",
        price_minor: 90_000,
        tokens_per_month: 300_000,
        duration_days: 30,
        assignments_allowed: Some(20),
        allowed_grades: ALL_GRADES,
        is_custom: false,
    },
    PlanDefinition {
        plan_type: PlanType::Unlimited,
        name: "Unlimited",
        price_minor: 150_000,
        tokens_per_month: 0,
        duration_days: 30,
        assignments_allowed: None,
        allowed_grades: ALL_GRADES,
        is_custom: false,
    },
    PlanDefinition {
        plan_type: PlanType::Custom,
        name: "Custom",
        price_minor: 0,
        tokens_per_month: 0,
        duration_days: 30,
        assignments_allowed: Some(CUSTOM_ASSIGNMENTS_ALLOWED),
        allowed_grades: &[],
        is_custom: true,
    },
];

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Immutable catalog of purchasable tiers.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    plans: &'static [PlanDefinition],
}

impl PlanCatalog {
    /// The standard production catalog.
    pub fn standard() -> Self {
        Self {
            plans: STANDARD_PLANS,
        }
    }

    /// All catalog entries, for display.
    pub fn list(&self) -> &[PlanDefinition] {
        self.plans
    }

    /// Look up a tier definition.
    pub fn definition(&self, plan_type: PlanType) -> Option<&PlanDefinition> {
        self.plans.iter().find(|p| p.plan_type == plan_type)
    }

    /// Look up a fixed (non-custom, purchasable) tier for pricing a purchase.
    ///
    /// FREE is not purchasable and CUSTOM is priced by quantity, so both are
    /// rejected here.
    pub fn purchasable_fixed(&self, plan_type: PlanType) -> Result<&PlanDefinition, CoreError> {
        match plan_type {
            PlanType::Free => Err(CoreError::Validation(
                "The FREE tier cannot be purchased".into(),
            )),
            PlanType::Custom => Err(CoreError::Validation(
                "Custom purchases must supply a token quantity and target grade".into(),
            )),
            _ => self.definition(plan_type).ok_or(CoreError::Validation(
                "Plan type is not in the catalog".into(),
            )),
        }
    }

    /// Whether a fixed tier authorizes the given grade. Always `false` for
    /// CUSTOM -- a custom balance carries its own grade ceiling.
    pub fn allows_grade(&self, plan_type: PlanType, grade: Grade) -> bool {
        self.definition(plan_type)
            .map(|def| def.allowed_grades.contains(&grade))
            .unwrap_or(false)
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
