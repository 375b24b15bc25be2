//! Exchange rate table against a fixed base currency

use crate::core::error::{CatalogError, Result};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info};

pub const DEFAULT_BASE_CURRENCY: &str = "USD";

/// Holds the code -> rate mapping. The base currency is implicit with a rate
/// of one and is never part of the mutable table.
pub struct CurrencyRegistry {
    base: String,
    rates: RwLock<HashMap<String, Decimal>>,
}

impl CurrencyRegistry {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.to_string(),
            rates: RwLock::new(HashMap::new()),
        }
    }

    /// Builds a registry seeded with `rates`. Every seed goes through `upsert`,
    /// so invalid seeds are rejected the same way runtime writes are.
    pub fn with_rates<'a, I>(base: &str, rates: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a Decimal)>,
    {
        let registry = Self::new(base);
        for (code, rate) in rates {
            if code == base {
                // The base rate is fixed at one, a seed for it carries no information.
                continue;
            }
            registry.upsert(code, *rate)?;
        }
        Ok(registry)
    }

    pub fn base_code(&self) -> &str {
        &self.base
    }

    pub fn lookup(&self, code: &str) -> Option<Decimal> {
        if code == self.base {
            return Some(Decimal::ONE);
        }
        let rates = self.rates.read().unwrap_or_else(PoisonError::into_inner);
        rates.get(code).copied()
    }

    pub fn insert(&self, code: &str, rate: Decimal) -> Result<()> {
        validate(code, rate)?;
        if code == self.base {
            return Err(CatalogError::AlreadyExists(format!("currency {code}")));
        }

        let mut rates = self.rates.write().unwrap_or_else(PoisonError::into_inner);
        if rates.contains_key(code) {
            return Err(CatalogError::AlreadyExists(format!("currency {code}")));
        }
        rates.insert(code.to_string(), rate);
        info!(code, %rate, "Currency added");
        Ok(())
    }

    /// Inserts or overwrites the rate for `code`. No prior entry is required.
    /// A valid rate for the base code is accepted and leaves the base at one.
    pub fn upsert(&self, code: &str, rate: Decimal) -> Result<()> {
        validate(code, rate)?;
        if code == self.base {
            debug!(code, %rate, "Ignoring rate for base currency");
            return Ok(());
        }

        let mut rates = self.rates.write().unwrap_or_else(PoisonError::into_inner);
        let previous = rates.insert(code.to_string(), rate);
        match previous {
            Some(old) => info!(code, %old, new = %rate, "Exchange rate updated"),
            None => info!(code, %rate, "Exchange rate created"),
        }
        Ok(())
    }

    /// Snapshot of every known rate, the base currency included.
    pub fn rates(&self) -> BTreeMap<String, Decimal> {
        let rates = self.rates.read().unwrap_or_else(PoisonError::into_inner);
        let mut snapshot: BTreeMap<String, Decimal> =
            rates.iter().map(|(k, v)| (k.clone(), *v)).collect();
        snapshot.insert(self.base.clone(), Decimal::ONE);
        debug!(count = snapshot.len(), "Listed exchange rates");
        snapshot
    }
}

fn validate(code: &str, rate: Decimal) -> Result<()> {
    if code.trim().is_empty() {
        return Err(CatalogError::invalid("currency code must not be blank"));
    }
    if rate <= Decimal::ZERO {
        return Err(CatalogError::invalid(format!(
            "exchange rate for {code} must be positive, got {rate}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn registry() -> CurrencyRegistry {
        let registry = CurrencyRegistry::new("USD");
        registry.insert("EUR", dec!(0.92)).unwrap();
        registry
    }

    #[test]
    fn test_base_is_constant_one() {
        let registry = registry();
        assert_eq!(registry.base_code(), "USD");
        assert_eq!(registry.lookup("USD"), Some(Decimal::ONE));
        assert_eq!(registry.rates().get("USD"), Some(&Decimal::ONE));
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let registry = registry();
        assert!(matches!(
            registry.insert("USD", dec!(3)),
            Err(CatalogError::AlreadyExists(_))
        ));
        assert!(matches!(
            registry.insert("EUR", dec!(0.5)),
            Err(CatalogError::AlreadyExists(_))
        ));
        assert_eq!(registry.lookup("EUR"), Some(dec!(0.92)));
    }

    #[test]
    fn test_non_positive_rates_are_invalid() {
        let registry = registry();
        assert!(registry.insert("GBP", dec!(0)).unwrap_err().is_invalid_argument());
        assert!(registry.upsert("GBP", dec!(-1)).unwrap_err().is_invalid_argument());
        assert!(registry.insert(" ", dec!(1)).unwrap_err().is_invalid_argument());
        assert_eq!(registry.lookup("GBP"), None);
    }

    #[test]
    fn test_upsert_does_not_require_existing_entry() {
        let registry = registry();
        registry.upsert("NEW", dec!(2.0)).unwrap();
        assert_eq!(registry.lookup("NEW"), Some(dec!(2.0)));

        registry.upsert("EUR", dec!(0.95)).unwrap();
        assert_eq!(registry.lookup("EUR"), Some(dec!(0.95)));
    }

    #[test]
    fn test_upsert_on_base_keeps_rate_at_one() {
        let registry = registry();
        registry.upsert("USD", dec!(2)).unwrap();
        assert_eq!(registry.lookup("USD"), Some(Decimal::ONE));
        assert_eq!(registry.rates().get("USD"), Some(&Decimal::ONE));
        assert!(registry.upsert("USD", dec!(0)).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_with_rates_skips_base_seed() {
        let seeds: BTreeMap<String, Decimal> = [
            ("USD".to_string(), dec!(1)),
            ("JPY".to_string(), dec!(150.12)),
        ]
        .into_iter()
        .collect();
        let registry = CurrencyRegistry::with_rates("USD", &seeds).unwrap();
        assert_eq!(registry.lookup("JPY"), Some(dec!(150.12)));
        assert_eq!(registry.rates().len(), 2);
    }

    #[test]
    fn test_concurrent_writers_do_not_lose_updates() {
        let registry = Arc::new(CurrencyRegistry::new("USD"));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for j in 0..50 {
                        registry
                            .upsert(&format!("C{i}_{j}"), Decimal::from(j + 1))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        // 400 written codes plus the base
        assert_eq!(registry.rates().len(), 401);
    }
}
