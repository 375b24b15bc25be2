use crate::core::model::{
    Comment, CommentId, Customer, CustomerId, PaymentMethod, PaymentMethodId, PriceAuditEntry,
    Product, ProductId,
};
use crate::core::store::{
    CommentStore, CustomerStore, PaymentMethodStore, PriceHistoryStore, ProductStore,
    sort_newest_first,
};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde::{Serialize, de::DeserializeOwned};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

fn id_key(id: u64) -> Vec<u8> {
    id.to_be_bytes().to_vec()
}

/// Parent id followed by child id, so a prefix scan on the parent yields its
/// children in insertion order.
fn child_key(parent: u64, child: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(16);
    key.extend_from_slice(&parent.to_be_bytes());
    key.extend_from_slice(&child.to_be_bytes());
    key
}

fn decode_id(bytes: &[u8]) -> Result<u64> {
    let tail: [u8; 8] = bytes
        .get(bytes.len().saturating_sub(8)..)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| anyhow!("Malformed key of {} bytes", bytes.len()))?;
    Ok(u64::from_be_bytes(tail))
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Highest id found in the trailing eight bytes of any key.
fn max_id(partition: &PartitionHandle) -> Result<u64> {
    let mut max = 0;
    for item in partition.iter() {
        let (key, _) = item?;
        max = max.max(decode_id(&key)?);
    }
    Ok(max)
}

fn scan<T: DeserializeOwned>(partition: &PartitionHandle, prefix: Option<&[u8]>) -> Result<Vec<T>> {
    let mut values = Vec::new();
    match prefix {
        Some(prefix) => {
            for item in partition.prefix(prefix) {
                let (_, value) = item?;
                values.push(decode(&value)?);
            }
        }
        None => {
            for item in partition.iter() {
                let (_, value) = item?;
                values.push(decode(&value)?);
            }
        }
    }
    Ok(values)
}

/// Id counter whose high-water mark is stored in the `meta` partition, so
/// ids of removed records are never handed out again.
struct Sequence {
    name: &'static str,
    last: Mutex<u64>,
}

impl Sequence {
    fn recover(meta: &PartitionHandle, name: &'static str, table: &PartitionHandle) -> Result<Self> {
        let stored = match meta.get(name.as_bytes())? {
            Some(bytes) => decode_id(&bytes)?,
            None => 0,
        };
        let last = stored.max(max_id(table)?);
        debug!(name, last, "Recovered id sequence");
        Ok(Self {
            name,
            last: Mutex::new(last),
        })
    }
}

/// Durable store on a fjall keyspace with one partition per table.
/// Multi-record writes go through a single write batch.
pub struct DiskStore {
    keyspace: Keyspace,
    products: PartitionHandle,
    customers: PartitionHandle,
    comments: PartitionHandle,
    price_history: PartitionHandle,
    payment_methods: PartitionHandle,
    meta: PartitionHandle,
    product_ids: Sequence,
    customer_ids: Sequence,
    comment_ids: Sequence,
    audit_ids: Sequence,
    payment_method_ids: Sequence,
}

impl DiskStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;
        let keyspace = Config::new(path)
            .open()
            .with_context(|| format!("Failed to open catalog at {}", path.display()))?;

        let open = |name: &str| -> Result<PartitionHandle> {
            keyspace
                .open_partition(name, PartitionCreateOptions::default())
                .with_context(|| format!("Failed to open partition {name}"))
        };
        let products = open("products")?;
        let customers = open("customers")?;
        let comments = open("comments")?;
        let price_history = open("price_history")?;
        let payment_methods = open("payment_methods")?;
        let meta = open("meta")?;

        let store = Self {
            product_ids: Sequence::recover(&meta, "product_ids", &products)?,
            customer_ids: Sequence::recover(&meta, "customer_ids", &customers)?,
            comment_ids: Sequence::recover(&meta, "comment_ids", &comments)?,
            audit_ids: Sequence::recover(&meta, "audit_ids", &price_history)?,
            payment_method_ids: Sequence::recover(&meta, "payment_method_ids", &payment_methods)?,
            meta,
            keyspace,
            products,
            customers,
            comments,
            price_history,
            payment_methods,
        };
        debug!("Opened catalog store at {}", path.display());
        Ok(store)
    }

    /// Allocates the next id and persists the new high-water mark before
    /// handing it out.
    fn next_id(&self, sequence: &Sequence) -> Result<u64> {
        let mut last = sequence.last.lock().unwrap_or_else(PoisonError::into_inner);
        let id = *last + 1;
        self.meta.insert(sequence.name.as_bytes(), id_key(id))?;
        self.sync()?;
        *last = id;
        Ok(id)
    }

    fn sync(&self) -> Result<()> {
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, partition: &PartitionHandle, key: &[u8]) -> Result<Option<T>> {
        match partition.get(key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put<T: Serialize>(&self, partition: &PartitionHandle, key: Vec<u8>, value: &T) -> Result<()> {
        partition.insert(key, encode(value)?)?;
        self.sync()
    }
}

#[async_trait]
impl ProductStore for DiskStore {
    async fn next_product_id(&self) -> Result<ProductId> {
        self.next_id(&self.product_ids)
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        self.get(&self.products, &id_key(id))
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        scan(&self.products, None)
    }

    async fn save_product(&self, product: &Product) -> Result<()> {
        debug!(id = product.id, "Disk PUT product");
        self.put(&self.products, id_key(product.id), product)
    }

    async fn remove_product_cascade(&self, id: ProductId) -> Result<usize> {
        let prefix = id_key(id);
        let mut batch = self.keyspace.batch();
        let mut removed = 0;
        for item in self.comments.prefix(&prefix) {
            let (key, _) = item?;
            batch.remove(&self.comments, key);
            removed += 1;
        }
        batch.remove(&self.products, prefix);
        batch.commit()?;
        self.sync()?;
        debug!(id, comments = removed, "Disk REMOVE product");
        Ok(removed)
    }
}

#[async_trait]
impl PriceHistoryStore for DiskStore {
    async fn append_price_entry(&self, mut entry: PriceAuditEntry) -> Result<PriceAuditEntry> {
        entry.id = self.next_id(&self.audit_ids)?;
        self.put(
            &self.price_history,
            child_key(entry.product_id, entry.id),
            &entry,
        )?;
        Ok(entry)
    }

    async fn append_price_change(
        &self,
        mut entry: PriceAuditEntry,
        product: &Product,
    ) -> Result<PriceAuditEntry> {
        entry.id = self.next_id(&self.audit_ids)?;
        let mut batch = self.keyspace.batch();
        batch.insert(
            &self.price_history,
            child_key(entry.product_id, entry.id),
            encode(&entry)?,
        );
        batch.insert(&self.products, id_key(product.id), encode(product)?);
        batch.commit()?;
        self.sync()?;
        debug!(product = product.id, entry = entry.id, "Disk PUT price change");
        Ok(entry)
    }

    async fn find_price_history(&self, product_id: ProductId) -> Result<Vec<PriceAuditEntry>> {
        let mut entries: Vec<PriceAuditEntry> =
            scan(&self.price_history, Some(&id_key(product_id)))?;
        sort_newest_first(&mut entries);
        Ok(entries)
    }
}

#[async_trait]
impl CustomerStore for DiskStore {
    async fn next_customer_id(&self) -> Result<CustomerId> {
        self.next_id(&self.customer_ids)
    }

    async fn find_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        self.get(&self.customers, &id_key(id))
    }

    async fn save_customer(&self, customer: &Customer) -> Result<()> {
        self.put(&self.customers, id_key(customer.id), customer)
    }
}

#[async_trait]
impl CommentStore for DiskStore {
    async fn next_comment_id(&self) -> Result<CommentId> {
        self.next_id(&self.comment_ids)
    }

    async fn save_comment(&self, comment: &Comment) -> Result<()> {
        self.put(
            &self.comments,
            child_key(comment.product_id, comment.id),
            comment,
        )
    }

    async fn find_comments_by_product(&self, product_id: ProductId) -> Result<Vec<Comment>> {
        scan(&self.comments, Some(&id_key(product_id)))
    }
}

#[async_trait]
impl PaymentMethodStore for DiskStore {
    async fn next_payment_method_id(&self) -> Result<PaymentMethodId> {
        self.next_id(&self.payment_method_ids)
    }

    async fn find_payment_method(&self, id: PaymentMethodId) -> Result<Option<PaymentMethod>> {
        self.get(&self.payment_methods, &id_key(id))
    }

    // TODO: index methods by customer once catalogs outgrow a full scan here
    async fn find_payment_methods_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<PaymentMethod>> {
        let methods: Vec<PaymentMethod> = scan(&self.payment_methods, None)?;
        Ok(methods
            .into_iter()
            .filter(|m| m.customer_id == customer_id)
            .collect())
    }

    async fn find_default_payment_method(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<PaymentMethod>> {
        let methods = self.find_payment_methods_by_customer(customer_id).await?;
        Ok(methods.into_iter().find(|m| m.is_default))
    }

    async fn save_payment_methods(&self, methods: &[PaymentMethod]) -> Result<()> {
        let mut batch = self.keyspace.batch();
        for method in methods {
            debug!(id = method.id, default = method.is_default, "Disk PUT payment method");
            batch.insert(&self.payment_methods, id_key(method.id), encode(method)?);
        }
        batch.commit()?;
        self.sync()
    }

    async fn delete_payment_method(
        &self,
        id: PaymentMethodId,
        promoted: Option<&PaymentMethod>,
    ) -> Result<()> {
        let mut batch = self.keyspace.batch();
        batch.remove(&self.payment_methods, id_key(id));
        if let Some(method) = promoted {
            batch.insert(&self.payment_methods, id_key(method.id), encode(method)?);
        }
        batch.commit()?;
        self.sync()?;
        debug!(id, "Disk REMOVE payment method");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn product(id: ProductId) -> Product {
        let now = Utc::now();
        Product {
            id,
            model_id: 3,
            color_id: 1,
            package_type_id: 2,
            price: dec!(25000),
            stock: 2,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn method(id: PaymentMethodId, customer_id: CustomerId, is_default: bool) -> PaymentMethod {
        let now = Utc::now();
        PaymentMethod {
            id,
            customer_id,
            bank_name: Some("Rust Bank".to_string()),
            account_number: None,
            card_number: Some("****-****-****-4242".to_string()),
            card_holder_name: None,
            expiry_date: None,
            is_default,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_keys_sort_numerically() {
        assert!(id_key(2) < id_key(10));
        assert!(child_key(1, 300) < child_key(2, 1));
        assert_eq!(decode_id(&child_key(7, 300)).unwrap(), 300);
        assert!(decode_id(&[1, 2]).is_err());
    }

    #[tokio::test]
    async fn test_price_change_writes_both_records() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();

        let id = store.next_product_id().await.unwrap();
        let mut item = product(id);
        store.save_product(&item).await.unwrap();

        item.price = dec!(24000);
        let entry = PriceAuditEntry {
            id: 0,
            product_id: id,
            old_price: dec!(25000),
            new_price: dec!(24000),
            currency: "USD".to_string(),
            changed_by: Some("admin".to_string()),
            changed_at: Utc::now(),
        };
        let stored = store.append_price_change(entry, &item).await.unwrap();
        assert_eq!(stored.id, 1);

        let reloaded = store.find_product(id).await.unwrap().unwrap();
        assert_eq!(reloaded.price, dec!(24000));
        let history = store.find_price_history(id).await.unwrap();
        assert_eq!(history, vec![stored]);
        assert!(store.find_price_history(id + 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_product_cascades_to_comments() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();
        store.save_product(&product(1)).await.unwrap();
        store.save_product(&product(2)).await.unwrap();
        for (product_id, rating) in [(1, 4), (1, 5), (2, 3)] {
            let id = store.next_comment_id().await.unwrap();
            store
                .save_comment(&Comment {
                    id,
                    product_id,
                    customer_id: 9,
                    body: "Great handling".to_string(),
                    rating,
                    is_approved: true,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        assert_eq!(store.remove_product_cascade(1).await.unwrap(), 2);
        assert!(store.find_product(1).await.unwrap().is_none());
        assert!(store.find_comments_by_product(1).await.unwrap().is_empty());
        assert_eq!(store.find_comments_by_product(2).await.unwrap().len(), 1);
        assert_eq!(store.list_products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_payment_method_batches() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();

        store
            .save_payment_methods(&[method(1, 5, true), method(2, 5, false), method(3, 6, true)])
            .await
            .unwrap();
        let ids: Vec<_> = store
            .find_payment_methods_by_customer(5)
            .await
            .unwrap()
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(
            store.find_default_payment_method(5).await.unwrap().map(|m| m.id),
            Some(1)
        );

        store
            .delete_payment_method(1, Some(&method(2, 5, true)))
            .await
            .unwrap();
        assert!(store.find_payment_method(1).await.unwrap().is_none());
        assert_eq!(
            store.find_default_payment_method(5).await.unwrap().map(|m| m.id),
            Some(2)
        );
        assert_eq!(
            store.find_default_payment_method(6).await.unwrap().map(|m| m.id),
            Some(3)
        );
    }
    #[tokio::test]
    async fn test_sequences_resume_after_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = DiskStore::open(dir.path()).unwrap();
            for _ in 0..3 {
                let id = store.next_product_id().await.unwrap();
                store.save_product(&product(id)).await.unwrap();
            }
        }

        let store = DiskStore::open(dir.path()).unwrap();
        assert_eq!(store.list_products().await.unwrap().len(), 3);
        assert_eq!(store.next_product_id().await.unwrap(), 4);
        assert_eq!(store.next_customer_id().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_removed_product_id_is_not_reused_after_reopen() {
        let dir = tempdir().unwrap();
        let old_id = {
            let store = DiskStore::open(dir.path()).unwrap();
            let id = store.next_product_id().await.unwrap();
            let mut item = product(id);
            store.save_product(&item).await.unwrap();
            item.price = dec!(24000);
            let entry = PriceAuditEntry {
                id: 0,
                product_id: id,
                old_price: dec!(25000),
                new_price: dec!(24000),
                currency: "USD".to_string(),
                changed_by: None,
                changed_at: Utc::now(),
            };
            store.append_price_change(entry, &item).await.unwrap();
            store.remove_product_cascade(id).await.unwrap();
            id
        };

        let store = DiskStore::open(dir.path()).unwrap();
        assert!(store.list_products().await.unwrap().is_empty());
        let new_id = store.next_product_id().await.unwrap();
        assert_ne!(new_id, old_id);
        assert!(store.find_price_history(new_id).await.unwrap().is_empty());
        assert_eq!(store.find_price_history(old_id).await.unwrap().len(), 1);
    }
}
