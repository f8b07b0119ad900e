//! Custom-tier pricing: a pure, total function of quantity and target grade.
//!
//! Prices are linear in the requested token quantity, with a per-token rate
//! that depends on the target grade. DISTINCTION work costs more to fulfil
//! downstream, so it carries both a higher rate and a strictly higher
//! minimum quantity.

use crate::error::CoreError;
use crate::plans::Grade;

// ---------------------------------------------------------------------------
// Minimums and rates
// ---------------------------------------------------------------------------

/// Minimum custom token quantity for PASS and MERIT purchases.
pub const CUSTOM_MIN_TOKENS: i64 = 10_000;

/// Minimum custom token quantity for DISTINCTION purchases.
pub const CUSTOM_MIN_TOKENS_DISTINCTION: i64 = 25_000;

/// Price per token in minor currency units, PASS and MERIT.
pub const RATE_MINOR_PER_TOKEN: i64 = 2;

/// Price per token in minor currency units, DISTINCTION.
pub const RATE_MINOR_PER_TOKEN_DISTINCTION: i64 = 3;

/// The minimum purchasable quantity for a target grade.
pub fn min_tokens_for(grade: Grade) -> i64 {
    match grade {
        Grade::Pass | Grade::Merit => CUSTOM_MIN_TOKENS,
        Grade::Distinction => CUSTOM_MIN_TOKENS_DISTINCTION,
    }
}

/// The per-token rate in minor currency units for a target grade.
pub fn rate_minor_per_token(grade: Grade) -> i64 {
    match grade {
        Grade::Pass | Grade::Merit => RATE_MINOR_PER_TOKEN,
        Grade::Distinction => RATE_MINOR_PER_TOKEN_DISTINCTION,
    }
}

// ---------------------------------------------------------------------------
// Price calculation
// ---------------------------------------------------------------------------

/// Price a custom purchase of `quantity` tokens at target grade `grade`.
///
/// Returns the price in minor currency units, or
/// [`CoreError::InvalidQuantity`] when the quantity is below the grade's
/// minimum. Strictly monotonic in `quantity` for a fixed grade.
pub fn custom_plan_price(quantity: i64, grade: Grade) -> Result<i64, CoreError> {
    let min = min_tokens_for(grade);
    if quantity < min {
        return Err(CoreError::InvalidQuantity(format!(
            "Custom {} purchases require at least {min} tokens, got {quantity}",
            grade.as_str()
        )));
    }
    Ok(quantity * rate_minor_per_token(grade))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_is_linear_in_quantity() {
        let price = custom_plan_price(10_000, Grade::Pass).unwrap();
        assert_eq!(price, 10_000 * RATE_MINOR_PER_TOKEN);

        let doubled = custom_plan_price(20_000, Grade::Pass).unwrap();
        assert_eq!(doubled, 2 * price);
    }

    #[test]
    fn merit_and_pass_share_a_rate() {
        assert_eq!(
            custom_plan_price(12_000, Grade::Pass).unwrap(),
            custom_plan_price(12_000, Grade::Merit).unwrap()
        );
    }

    #[test]
    fn distinction_costs_more_per_token() {
        let q = CUSTOM_MIN_TOKENS_DISTINCTION;
        let pass = custom_plan_price(q, Grade::Pass).unwrap();
        let distinction = custom_plan_price(q, Grade::Distinction).unwrap();
        assert!(distinction > pass);
    }

    #[test]
    fn price_is_strictly_monotonic() {
        for grade in [Grade::Pass, Grade::Merit, Grade::Distinction] {
            let min = min_tokens_for(grade);
            let mut prev = custom_plan_price(min, grade).unwrap();
            for q in (min + 1)..(min + 5) {
                let next = custom_plan_price(q, grade).unwrap();
                assert!(next > prev, "price must strictly increase at q={q}");
                prev = next;
            }
        }
    }

    #[test]
    fn below_minimum_is_rejected() {
        assert!(matches!(
            custom_plan_price(CUSTOM_MIN_TOKENS - 1, Grade::Pass),
            Err(CoreError::InvalidQuantity(_))
        ));
        assert!(matches!(
            custom_plan_price(0, Grade::Merit),
            Err(CoreError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn distinction_minimum_is_strictly_higher() {
        assert!(CUSTOM_MIN_TOKENS_DISTINCTION > CUSTOM_MIN_TOKENS);

        // 3 000 tokens at DISTINCTION is under the 25 000 floor.
        assert!(matches!(
            custom_plan_price(3_000, Grade::Distinction),
            Err(CoreError::InvalidQuantity(_))
        ));
        // The same quantity below the standard floor fails for PASS too.
        assert!(custom_plan_price(3_000, Grade::Pass).is_err());
        // But a quantity legal for PASS can still be illegal for DISTINCTION.
        assert!(custom_plan_price(CUSTOM_MIN_TOKENS, Grade::Pass).is_ok());
        assert!(custom_plan_price(CUSTOM_MIN_TOKENS, Grade::Distinction).is_err());
    }

    #[test]
    fn price_at_exact_minimum_is_defined() {
        assert!(custom_plan_price(CUSTOM_MIN_TOKENS, Grade::Merit).is_ok());
        assert!(custom_plan_price(CUSTOM_MIN_TOKENS_DISTINCTION, Grade::Distinction).is_ok());
    }
}
