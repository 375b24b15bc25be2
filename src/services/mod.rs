//! Orchestrators enforcing the catalog's multi-record invariants

pub mod audit;
pub mod payment;
pub mod pricing;

pub use audit::PriceAuditLog;
pub use payment::PaymentMethodManager;
pub use pricing::{ProductPricingService, ProductQuote};
