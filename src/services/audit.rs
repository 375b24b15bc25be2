use crate::core::error::Result;
use crate::core::model::{PriceAuditEntry, Product, ProductId};
use crate::core::store::PriceHistoryStore;
use std::sync::Arc;
use tracing::debug;

/// Append-only ledger of price changes. Entries are never updated or removed.
#[derive(Clone)]
pub struct PriceAuditLog {
    store: Arc<dyn PriceHistoryStore>,
}

impl PriceAuditLog {
    pub fn new(store: Arc<dyn PriceHistoryStore>) -> Self {
        Self { store }
    }

    pub async fn record(&self, entry: PriceAuditEntry) -> Result<PriceAuditEntry> {
        let entry = self.store.append_price_entry(entry).await?;
        debug!(product = entry.product_id, entry = entry.id, "Recorded price entry");
        Ok(entry)
    }

    /// Records `entry` and persists `product` as one atomic write.
    pub async fn record_with_price(
        &self,
        entry: PriceAuditEntry,
        product: &Product,
    ) -> Result<PriceAuditEntry> {
        let entry = self.store.append_price_change(entry, product).await?;
        debug!(product = entry.product_id, entry = entry.id, "Recorded price change");
        Ok(entry)
    }

    /// Newest first; a fresh snapshot on every call.
    pub async fn history_for(&self, product_id: ProductId) -> Result<Vec<PriceAuditEntry>> {
        Ok(self.store.find_price_history(product_id).await?)
    }
}
