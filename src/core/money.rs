//! Monetary amounts and rounding rules

use crate::core::error::{CatalogError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Money is always held in base currency units at rest.
pub type Money = Decimal;

/// Fractional digits kept for every persisted amount.
pub const MONEY_SCALE: u32 = 2;

/// Rounds to two fractional digits, midpoints away from zero (half-up).
pub fn round_money(amount: Decimal) -> Money {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Parses a user-supplied amount, rejecting anything that is not a plain
/// non-negative decimal.
pub fn parse_amount(input: &str) -> Result<Money> {
    let amount = Decimal::from_str(input.trim())
        .map_err(|_| CatalogError::invalid(format!("malformed monetary amount '{input}'")))?;
    ensure_non_negative(amount)?;
    Ok(amount)
}

pub fn ensure_non_negative(amount: Decimal) -> Result<()> {
    if amount < Decimal::ZERO {
        return Err(CatalogError::invalid(format!(
            "monetary amount must not be negative, got {amount}"
        )));
    }
    Ok(())
}
