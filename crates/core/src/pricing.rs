//! Pricing
//!
//! Prices are held in minor units (cents) and only rendered as fixed-point decimals at the edge.

use rusty_money::{Money, iso::Currency};
use thiserror::Error;

/// Errors that can occur while pricing line items.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// A subtotal or total does not fit in the amount type.
    #[error("amount overflow")]
    Overflow,
}

/// Unit price multiplied by quantity.
///
/// # Errors
///
/// Returns [`PricingError::Overflow`] if the product does not fit in a `u64`.
pub fn line_subtotal(unit_price: u64, quantity: u32) -> Result<u64, PricingError> {
    unit_price
        .checked_mul(u64::from(quantity))
        .ok_or(PricingError::Overflow)
}

/// Sum of `(unit_price, quantity)` lines.
///
/// # Errors
///
/// Returns [`PricingError::Overflow`] if any subtotal or the total does not fit in a `u64`.
pub fn total(lines: impl IntoIterator<Item = (u64, u32)>) -> Result<u64, PricingError> {
    lines
        .into_iter()
        .try_fold(0_u64, |acc, (unit_price, quantity)| {
            acc.checked_add(line_subtotal(unit_price, quantity)?)
                .ok_or(PricingError::Overflow)
        })
}

/// Render a minor-unit amount as a decimal string in `currency`, e.g. `1050` USD as `"10.50"`.
///
/// # Errors
///
/// Returns [`PricingError::Overflow`] if the amount does not fit in an `i64`.
pub fn render_amount(amount: u64, currency: &Currency) -> Result<String, PricingError> {
    let minor = i64::try_from(amount).map_err(|_source| PricingError::Overflow)?;

    let money = Money::from_minor(minor, currency);

    Ok(money.amount().round_dp(currency.exponent).to_string())
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{JPY, USD};
    use testresult::TestResult;

    use super::*;

    #[test]
    fn total_sums_line_subtotals() -> TestResult {
        assert_eq!(total([(10_00, 2), (2_50, 3)])?, 27_50);
        assert_eq!(total([])?, 0);

        Ok(())
    }

    #[test]
    fn total_reports_overflow() {
        assert_eq!(total([(u64::MAX, 2)]), Err(PricingError::Overflow));
    }

    #[test]
    fn render_amount_uses_currency_exponent() -> TestResult {
        assert_eq!(render_amount(10_50, USD)?, "10.50");
        assert_eq!(render_amount(7, USD)?, "0.07");
        assert_eq!(render_amount(500, JPY)?, "500");

        Ok(())
    }
}
