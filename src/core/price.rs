//! Conversion between the base currency and display currencies

use crate::core::currency::CurrencyRegistry;
use crate::core::error::{CatalogError, Result};
use crate::core::money::{Money, round_money};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Result of a display conversion, as handed to the outer layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    pub original_amount: Money,
    pub converted_amount: Money,
    pub currency_code: String,
    pub base_currency: String,
}

#[derive(Clone)]
pub struct PriceConverter {
    registry: Arc<CurrencyRegistry>,
}

impl PriceConverter {
    pub fn new(registry: Arc<CurrencyRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &CurrencyRegistry {
        &self.registry
    }

    /// Converts a base amount for display. Unknown codes fall back to a rate
    /// of one instead of failing; only an out-of-range result is an error.
    pub fn to_display(&self, amount: Money, code: &str) -> Result<Money> {
        let rate = self.registry.lookup(code).unwrap_or_else(|| {
            debug!(code, "Unknown display currency, using rate 1");
            Decimal::ONE
        });
        amount
            .checked_mul(rate)
            .map(round_money)
            .ok_or_else(|| out_of_range(amount, code))
    }

    /// Converts an amount given in `source` into base units. Unknown codes
    /// are rejected.
    pub fn to_base(&self, amount: Money, source: &str) -> Result<Money> {
        if source == self.registry.base_code() {
            return Ok(amount);
        }
        let rate = self
            .registry
            .lookup(source)
            .ok_or_else(|| CatalogError::invalid(format!("unknown currency '{source}'")))?;
        amount
            .checked_div(rate)
            .map(round_money)
            .ok_or_else(|| out_of_range(amount, source))
    }

    pub fn convert(&self, amount: Money, target: &str) -> Result<Conversion> {
        Ok(Conversion {
            original_amount: amount,
            converted_amount: self.to_display(amount, target)?,
            currency_code: target.to_string(),
            base_currency: self.registry.base_code().to_string(),
        })
    }
}

fn out_of_range(amount: Money, code: &str) -> CatalogError {
    CatalogError::invalid(format!("amount {amount} is out of range for {code}"))
}
