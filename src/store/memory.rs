use crate::core::model::{
    Comment, CommentId, Customer, CustomerId, PaymentMethod, PaymentMethodId, PriceAuditEntry,
    Product, ProductId,
};
use crate::core::store::{
    CommentStore, CustomerStore, PaymentMethodStore, PriceHistoryStore, ProductStore,
    sort_newest_first,
};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    customers: BTreeMap<CustomerId, Customer>,
    comments: BTreeMap<CommentId, Comment>,
    price_history: Vec<PriceAuditEntry>,
    payment_methods: BTreeMap<PaymentMethodId, PaymentMethod>,
    last_product_id: u64,
    last_customer_id: u64,
    last_comment_id: u64,
    last_audit_id: u64,
    last_payment_method_id: u64,
}

/// Volatile store keeping every table behind a single lock, so each
/// multi-table write is trivially atomic.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn next_product_id(&self) -> Result<ProductId> {
        let mut tables = self.inner.write().await;
        tables.last_product_id += 1;
        Ok(tables.last_product_id)
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.inner.read().await.products.get(&id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.inner.read().await.products.values().cloned().collect())
    }

    async fn save_product(&self, product: &Product) -> Result<()> {
        let mut tables = self.inner.write().await;
        debug!(id = product.id, "Memory PUT product");
        tables.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn remove_product_cascade(&self, id: ProductId) -> Result<usize> {
        let mut tables = self.inner.write().await;
        let before = tables.comments.len();
        tables.comments.retain(|_, c| c.product_id != id);
        let removed = before - tables.comments.len();
        tables.products.remove(&id);
        debug!(id, comments = removed, "Memory REMOVE product");
        Ok(removed)
    }
}

#[async_trait]
impl PriceHistoryStore for MemoryStore {
    async fn append_price_entry(&self, mut entry: PriceAuditEntry) -> Result<PriceAuditEntry> {
        let mut tables = self.inner.write().await;
        tables.last_audit_id += 1;
        entry.id = tables.last_audit_id;
        tables.price_history.push(entry.clone());
        Ok(entry)
    }

    async fn append_price_change(
        &self,
        mut entry: PriceAuditEntry,
        product: &Product,
    ) -> Result<PriceAuditEntry> {
        let mut tables = self.inner.write().await;
        tables.last_audit_id += 1;
        entry.id = tables.last_audit_id;
        tables.price_history.push(entry.clone());
        tables.products.insert(product.id, product.clone());
        debug!(product = product.id, entry = entry.id, "Memory PUT price change");
        Ok(entry)
    }

    async fn find_price_history(&self, product_id: ProductId) -> Result<Vec<PriceAuditEntry>> {
        let tables = self.inner.read().await;
        let mut entries: Vec<_> = tables
            .price_history
            .iter()
            .filter(|e| e.product_id == product_id)
            .cloned()
            .collect();
        sort_newest_first(&mut entries);
        Ok(entries)
    }
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn next_customer_id(&self) -> Result<CustomerId> {
        let mut tables = self.inner.write().await;
        tables.last_customer_id += 1;
        Ok(tables.last_customer_id)
    }

    async fn find_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        Ok(self.inner.read().await.customers.get(&id).cloned())
    }

    async fn save_customer(&self, customer: &Customer) -> Result<()> {
        let mut tables = self.inner.write().await;
        tables.customers.insert(customer.id, customer.clone());
        Ok(())
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn next_comment_id(&self) -> Result<CommentId> {
        let mut tables = self.inner.write().await;
        tables.last_comment_id += 1;
        Ok(tables.last_comment_id)
    }

    async fn save_comment(&self, comment: &Comment) -> Result<()> {
        let mut tables = self.inner.write().await;
        tables.comments.insert(comment.id, comment.clone());
        Ok(())
    }

    async fn find_comments_by_product(&self, product_id: ProductId) -> Result<Vec<Comment>> {
        let tables = self.inner.read().await;
        Ok(tables
            .comments
            .values()
            .filter(|c| c.product_id == product_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PaymentMethodStore for MemoryStore {
    async fn next_payment_method_id(&self) -> Result<PaymentMethodId> {
        let mut tables = self.inner.write().await;
        tables.last_payment_method_id += 1;
        Ok(tables.last_payment_method_id)
    }

    async fn find_payment_method(&self, id: PaymentMethodId) -> Result<Option<PaymentMethod>> {
        Ok(self.inner.read().await.payment_methods.get(&id).cloned())
    }

    async fn find_payment_methods_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<PaymentMethod>> {
        let tables = self.inner.read().await;
        Ok(tables
            .payment_methods
            .values()
            .filter(|m| m.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn find_default_payment_method(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<PaymentMethod>> {
        let tables = self.inner.read().await;
        Ok(tables
            .payment_methods
            .values()
            .find(|m| m.customer_id == customer_id && m.is_default)
            .cloned())
    }

    async fn save_payment_methods(&self, methods: &[PaymentMethod]) -> Result<()> {
        let mut tables = self.inner.write().await;
        for method in methods {
            debug!(id = method.id, default = method.is_default, "Memory PUT payment method");
            tables.payment_methods.insert(method.id, method.clone());
        }
        Ok(())
    }

    async fn delete_payment_method(
        &self,
        id: PaymentMethodId,
        promoted: Option<&PaymentMethod>,
    ) -> Result<()> {
        let mut tables = self.inner.write().await;
        tables.payment_methods.remove(&id);
        if let Some(method) = promoted {
            tables.payment_methods.insert(method.id, method.clone());
        }
        debug!(id, "Memory REMOVE payment method");
        Ok(())
    }
}
