//! Core business types, rules and collaborator contracts

pub mod config;
pub mod currency;
pub mod error;
pub mod lock;
pub mod log;
pub mod model;
pub mod money;
pub mod price;
pub mod store;

// Re-export main types for cleaner imports
pub use currency::CurrencyRegistry;
pub use error::{CatalogError, Result};
pub use money::Money;
pub use price::{Conversion, PriceConverter};
pub use store::CatalogStore;
