//! Persistence collaborators used by the catalog services.
//!
//! Method names carry the entity they operate on so that one backend can
//! implement every trait without call-site ambiguity. Methods documented as
//! atomic must make all of their effects visible together or none of them.

use crate::core::model::{
    Comment, CommentId, Customer, CustomerId, PaymentMethod, PaymentMethodId,
    PriceAuditEntry, Product, ProductId,
};
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn next_product_id(&self) -> Result<ProductId>;
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>>;
    /// All products in natural (ascending id) order.
    async fn list_products(&self) -> Result<Vec<Product>>;
    async fn save_product(&self, product: &Product) -> Result<()>;
    /// Atomic: removes the product together with all of its comments.
    /// Returns the number of comments removed.
    async fn remove_product_cascade(&self, id: ProductId) -> Result<usize>;
}

#[async_trait]
pub trait PriceHistoryStore: Send + Sync {
    /// Appends `entry`, assigning its id. Returns the stored entry.
    async fn append_price_entry(&self, entry: PriceAuditEntry) -> Result<PriceAuditEntry>;
    /// Atomic: appends `entry` and saves `product` in one write.
    async fn append_price_change(
        &self,
        entry: PriceAuditEntry,
        product: &Product,
    ) -> Result<PriceAuditEntry>;
    /// Entries of one product, newest first. Equal timestamps are ordered by
    /// descending id, i.e. the later insertion comes first.
    async fn find_price_history(&self, product_id: ProductId) -> Result<Vec<PriceAuditEntry>>;
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn next_customer_id(&self) -> Result<CustomerId>;
    async fn find_customer(&self, id: CustomerId) -> Result<Option<Customer>>;
    async fn save_customer(&self, customer: &Customer) -> Result<()>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn next_comment_id(&self) -> Result<CommentId>;
    async fn save_comment(&self, comment: &Comment) -> Result<()>;
    async fn find_comments_by_product(&self, product_id: ProductId) -> Result<Vec<Comment>>;
}

#[async_trait]
pub trait PaymentMethodStore: Send + Sync {
    async fn next_payment_method_id(&self) -> Result<PaymentMethodId>;
    async fn find_payment_method(&self, id: PaymentMethodId) -> Result<Option<PaymentMethod>>;
    /// Methods of one customer in natural (ascending id) order.
    async fn find_payment_methods_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<PaymentMethod>>;
    async fn find_default_payment_method(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<PaymentMethod>>;
    /// Atomic: inserts or replaces every method in `methods`.
    async fn save_payment_methods(&self, methods: &[PaymentMethod]) -> Result<()>;
    /// Atomic: deletes `id` and saves `promoted`, if given.
    async fn delete_payment_method(
        &self,
        id: PaymentMethodId,
        promoted: Option<&PaymentMethod>,
    ) -> Result<()>;
}

/// A backend serving every collaborator of the catalog.
pub trait CatalogStore:
    ProductStore + PriceHistoryStore + CustomerStore + CommentStore + PaymentMethodStore
{
}

impl<T> CatalogStore for T where
    T: ProductStore + PriceHistoryStore + CustomerStore + CommentStore + PaymentMethodStore
{
}

/// Orders audit entries newest first, later insertion first on equal timestamps.
pub fn sort_newest_first(entries: &mut [PriceAuditEntry]) {
    entries.sort_by(|a, b| {
        b.changed_at
            .cmp(&a.changed_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
