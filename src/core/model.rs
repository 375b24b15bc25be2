//! Catalog entities. Associations are plain identifiers resolved through the
//! stores, never embedded object graphs.

use crate::core::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ProductId = u64;
pub type CustomerId = u64;
pub type CommentId = u64;
pub type PaymentMethodId = u64;
pub type AuditEntryId = u64;

/// Reference data ids (model, color, package type) are owned elsewhere.
pub type ReferenceId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub model_id: ReferenceId,
    pub color_id: ReferenceId,
    pub package_type_id: ReferenceId,
    pub price: Money,
    pub stock: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub model_id: ReferenceId,
    pub color_id: ReferenceId,
    pub package_type_id: ReferenceId,
    pub price: Money,
    pub stock: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewCustomer {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub product_id: ProductId,
    pub customer_id: CustomerId,
    pub body: String,
    pub rating: u8,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}

/// One price transition of a product. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAuditEntry {
    pub id: AuditEntryId,
    pub product_id: ProductId,
    pub old_price: Money,
    pub new_price: Money,
    pub currency: String,
    pub changed_by: Option<String>,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: PaymentMethodId,
    pub customer_id: CustomerId,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub card_number: Option<String>,
    pub card_holder_name: Option<String>,
    pub expiry_date: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewPaymentMethod {
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub card_number: Option<String>,
    pub card_holder_name: Option<String>,
    pub expiry_date: Option<String>,
    pub is_default: bool,
}

/// Partial update: only `Some` fields are applied.
#[derive(Debug, Clone, Default)]
pub struct PaymentMethodPatch {
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub card_number: Option<String>,
    pub card_holder_name: Option<String>,
    pub expiry_date: Option<String>,
    pub is_default: Option<bool>,
}

impl PaymentMethod {
    /// Copies the detail fields of `patch` that are present. The default
    /// flag is handled by the payment method manager.
    pub fn merge_details(&mut self, patch: &PaymentMethodPatch) {
        if let Some(bank_name) = &patch.bank_name {
            self.bank_name = Some(bank_name.clone());
        }
        if let Some(account_number) = &patch.account_number {
            self.account_number = Some(account_number.clone());
        }
        if let Some(card_number) = &patch.card_number {
            self.card_number = Some(card_number.clone());
        }
        if let Some(card_holder_name) = &patch.card_holder_name {
            self.card_holder_name = Some(card_holder_name.clone());
        }
        if let Some(expiry_date) = &patch.expiry_date {
            self.expiry_date = Some(expiry_date.clone());
        }
    }
}
