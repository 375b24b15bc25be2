//! Payment methods and the one-default-per-customer protocol.
//!
//! Every mutation runs inside the owning customer's exclusive section and
//! hands all of its record changes to the store as one atomic write, so a
//! customer with methods always has exactly one default.

use crate::core::error::{CatalogError, Result};
use crate::core::lock::KeyedLocks;
use crate::core::model::{
    CustomerId, NewPaymentMethod, PaymentMethod, PaymentMethodId, PaymentMethodPatch,
};
use crate::core::store::{CustomerStore, PaymentMethodStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};

const VISIBLE_CARD_DIGITS: usize = 4;

/// Keeps only the last four characters of a card number. Numbers of four
/// characters or fewer are returned unchanged.
pub fn mask_card_number(card_number: &str) -> String {
    let chars: Vec<char> = card_number.chars().collect();
    if chars.len() <= VISIBLE_CARD_DIGITS {
        return card_number.to_string();
    }
    let last: String = chars[chars.len() - VISIBLE_CARD_DIGITS..].iter().collect();
    format!("****-****-****-{last}")
}

fn demoted(mut method: PaymentMethod, now: DateTime<Utc>) -> PaymentMethod {
    method.is_default = false;
    method.updated_at = now;
    method
}

pub struct PaymentMethodManager {
    methods: Arc<dyn PaymentMethodStore>,
    customers: Arc<dyn CustomerStore>,
    locks: KeyedLocks<CustomerId>,
}

impl PaymentMethodManager {
    pub fn new(methods: Arc<dyn PaymentMethodStore>, customers: Arc<dyn CustomerStore>) -> Self {
        Self {
            methods,
            customers,
            locks: KeyedLocks::new(),
        }
    }

    async fn ensure_customer(&self, customer_id: CustomerId) -> Result<()> {
        match self.customers.find_customer(customer_id).await? {
            Some(_) => Ok(()),
            None => Err(CatalogError::not_found("customer", customer_id)),
        }
    }

    async fn load(&self, id: PaymentMethodId) -> Result<PaymentMethod> {
        self.methods
            .find_payment_method(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("payment method", id))
    }

    /// Loads `id` and enters its customer's section. The record is read again
    /// under the lock, as it may have changed or vanished meanwhile.
    async fn load_locked(
        &self,
        id: PaymentMethodId,
    ) -> Result<(tokio::sync::OwnedMutexGuard<()>, PaymentMethod)> {
        let customer_id = self.load(id).await?.customer_id;
        let guard = self.locks.lock(customer_id).await;
        let method = self.load(id).await?;
        Ok((guard, method))
    }

    #[instrument(skip(self, new), fields(requested_default = new.is_default))]
    pub async fn add(
        &self,
        customer_id: CustomerId,
        new: NewPaymentMethod,
    ) -> Result<PaymentMethod> {
        let _guard = self.locks.lock(customer_id).await;
        self.ensure_customer(customer_id).await?;

        let now = Utc::now();
        let existing = self
            .methods
            .find_payment_methods_by_customer(customer_id)
            .await?;
        let has_default = existing.iter().any(|m| m.is_default);

        let mut writes: Vec<PaymentMethod> = Vec::new();
        let is_default = if new.is_default {
            writes.extend(
                existing
                    .into_iter()
                    .filter(|m| m.is_default)
                    .map(|m| demoted(m, now)),
            );
            true
        } else {
            // The first method of a customer always becomes the default.
            !has_default
        };

        let method = PaymentMethod {
            id: self.methods.next_payment_method_id().await?,
            customer_id,
            bank_name: new.bank_name,
            account_number: new.account_number,
            card_number: new.card_number.as_deref().map(mask_card_number),
            card_holder_name: new.card_holder_name,
            expiry_date: new.expiry_date,
            is_default,
            created_at: now,
            updated_at: now,
        };
        writes.push(method.clone());
        self.methods.save_payment_methods(&writes).await?;

        info!(
            id = method.id,
            default = method.is_default,
            demoted = writes.len() - 1,
            "Payment method added"
        );
        Ok(method)
    }

    /// Applies the present fields of `patch`. A card number given here is
    /// stored as supplied; masking happens only when a method is added.
    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: PaymentMethodId,
        patch: PaymentMethodPatch,
    ) -> Result<PaymentMethod> {
        let (_guard, mut method) = self.load_locked(id).await?;

        let now = Utc::now();
        method.merge_details(&patch);
        method.updated_at = now;

        let mut writes: Vec<PaymentMethod> = Vec::new();
        if patch.is_default == Some(true) && !method.is_default {
            let siblings = self
                .methods
                .find_payment_methods_by_customer(method.customer_id)
                .await?;
            writes.extend(
                siblings
                    .into_iter()
                    .filter(|m| m.is_default && m.id != id)
                    .map(|m| demoted(m, now)),
            );
            method.is_default = true;
            info!(id, customer = method.customer_id, "Payment method promoted to default");
        }
        writes.push(method.clone());
        self.methods.save_payment_methods(&writes).await?;
        Ok(method)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: PaymentMethodId) -> Result<()> {
        let (_guard, method) = self.load_locked(id).await?;

        let promoted = if method.is_default {
            let siblings = self
                .methods
                .find_payment_methods_by_customer(method.customer_id)
                .await?;
            siblings.into_iter().find(|m| m.id != id).map(|mut next| {
                next.is_default = true;
                next.updated_at = Utc::now();
                next
            })
        } else {
            None
        };

        self.methods
            .delete_payment_method(id, promoted.as_ref())
            .await?;
        match &promoted {
            Some(next) => info!(id, promoted = next.id, "Deleted default payment method"),
            None => info!(id, "Deleted payment method"),
        }
        Ok(())
    }

    pub async fn get(&self, id: PaymentMethodId) -> Result<PaymentMethod> {
        self.load(id).await
    }

    pub async fn get_default(&self, customer_id: CustomerId) -> Result<Option<PaymentMethod>> {
        let _guard = self.locks.lock(customer_id).await;
        self.ensure_customer(customer_id).await?;
        Ok(self.methods.find_default_payment_method(customer_id).await?)
    }

    /// The default method first, the rest in store order.
    pub async fn list_for_customer(&self, customer_id: CustomerId) -> Result<Vec<PaymentMethod>> {
        let _guard = self.locks.lock(customer_id).await;
        self.ensure_customer(customer_id).await?;
        let mut methods = self
            .methods
            .find_payment_methods_by_customer(customer_id)
            .await?;
        methods.sort_by_key(|m| !m.is_default);
        debug!(customer_id, count = methods.len(), "Listed payment methods");
        Ok(methods)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Customer;
    use crate::store::memory::MemoryStore;

    async fn setup() -> (Arc<MemoryStore>, PaymentMethodManager, CustomerId) {
        let store = Arc::new(MemoryStore::new());
        let customer_id = add_customer(&store).await;
        let manager = PaymentMethodManager::new(store.clone(), store.clone());
        (store, manager, customer_id)
    }

    async fn add_customer(store: &MemoryStore) -> CustomerId {
        let now = Utc::now();
        let id = store.next_customer_id().await.unwrap();
        store
            .save_customer(&Customer {
                id,
                name: "Linus".to_string(),
                surname: "Torvalds".to_string(),
                email: format!("customer{id}@example.com"),
                phone_number: None,
                address: None,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        id
    }

    fn card(number: &str, is_default: bool) -> NewPaymentMethod {
        NewPaymentMethod {
            card_number: Some(number.to_string()),
            card_holder_name: Some("L. Torvalds".to_string()),
            is_default,
            ..Default::default()
        }
    }

    async fn default_ids(store: &MemoryStore, customer_id: CustomerId) -> Vec<PaymentMethodId> {
        store
            .find_payment_methods_by_customer(customer_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.is_default)
            .map(|m| m.id)
            .collect()
    }

    #[test]
    fn test_mask_card_number() {
        assert_eq!(mask_card_number("4111111111111111"), "****-****-****-1111");
        assert_eq!(mask_card_number("12345"), "****-****-****-2345");
        assert_eq!(mask_card_number("1234"), "1234");
        assert_eq!(mask_card_number(""), "");
    }

    #[tokio::test]
    async fn test_first_method_is_forced_default() {
        let (_, manager, customer) = setup().await;
        let first = manager.add(customer, card("4111111111111111", false)).await.unwrap();
        assert!(first.is_default);
        assert_eq!(first.card_number.as_deref(), Some("****-****-****-1111"));

        let second = manager.add(customer, card("5500000000000004", false)).await.unwrap();
        assert!(!second.is_default);
        assert_eq!(manager.get_default(customer).await.unwrap().unwrap().id, first.id);
    }

    #[tokio::test]
    async fn test_add_default_demotes_current() {
        let (store, manager, customer) = setup().await;
        let first = manager.add(customer, card("1111222233334444", false)).await.unwrap();
        let second = manager.add(customer, card("5555666677778888", true)).await.unwrap();

        assert!(second.is_default);
        assert_eq!(default_ids(&store, customer).await, vec![second.id]);
        assert!(!manager.get(first.id).await.unwrap().is_default);
    }

    #[tokio::test]
    async fn test_add_requires_customer() {
        let (_, manager, _) = setup().await;
        let err = manager.add(999, card("1234", false)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_merges_and_promotes() {
        let (store, manager, customer) = setup().await;
        let first = manager.add(customer, card("1111222233334444", false)).await.unwrap();
        let second = manager.add(customer, card("5555666677778888", false)).await.unwrap();

        let updated = manager
            .update(
                second.id,
                PaymentMethodPatch {
                    bank_name: Some("Ferris Credit Union".to_string()),
                    is_default: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.is_default);
        assert_eq!(updated.bank_name.as_deref(), Some("Ferris Credit Union"));
        assert_eq!(updated.card_holder_name.as_deref(), Some("L. Torvalds"));
        assert_eq!(default_ids(&store, customer).await, vec![second.id]);

        // A default cannot be cleared through a patch
        let unchanged = manager
            .update(
                second.id,
                PaymentMethodPatch {
                    is_default: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(unchanged.is_default);
        assert!(!manager.get(first.id).await.unwrap().is_default);
    }

    #[tokio::test]
    async fn test_update_does_not_mask_new_card_numbers() {
        let (_, manager, customer) = setup().await;
        let method = manager.add(customer, card("4111111111111111", false)).await.unwrap();
        let updated = manager
            .update(
                method.id,
                PaymentMethodPatch {
                    card_number: Some("4000056655665556".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.card_number.as_deref(), Some("4000056655665556"));
    }

    #[tokio::test]
    async fn test_update_missing_method() {
        let (_, manager, _) = setup().await;
        let err = manager
            .update(42, PaymentMethodPatch::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_default_promotes_first_remaining() {
        let (store, manager, customer) = setup().await;
        let first = manager.add(customer, card("1111", true)).await.unwrap();
        let second = manager.add(customer, card("2222", false)).await.unwrap();
        let third = manager.add(customer, card("3333", false)).await.unwrap();

        manager.delete(first.id).await.unwrap();

        assert_eq!(default_ids(&store, customer).await, vec![second.id]);
        assert!(!manager.get(third.id).await.unwrap().is_default);
        assert!(manager.get(first.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_non_default_keeps_default() {
        let (store, manager, customer) = setup().await;
        let first = manager.add(customer, card("1111", false)).await.unwrap();
        let second = manager.add(customer, card("2222", false)).await.unwrap();

        manager.delete(second.id).await.unwrap();
        assert_eq!(default_ids(&store, customer).await, vec![first.id]);
    }

    #[tokio::test]
    async fn test_delete_only_method_leaves_no_default() {
        let (_, manager, customer) = setup().await;
        let only = manager.add(customer, card("1111", false)).await.unwrap();

        manager.delete(only.id).await.unwrap();
        assert!(manager.get_default(customer).await.unwrap().is_none());
        assert!(manager.list_for_customer(customer).await.unwrap().is_empty());
        assert!(manager.delete(only.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_puts_default_first() {
        let (_, manager, customer) = setup().await;
        let first = manager.add(customer, card("1111", false)).await.unwrap();
        let second = manager.add(customer, card("2222", false)).await.unwrap();
        let third = manager.add(customer, card("3333", true)).await.unwrap();

        let ids: Vec<_> = manager
            .list_for_customer(customer)
            .await
            .unwrap()
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![third.id, first.id, second.id]);
        assert!(manager.list_for_customer(77).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_customers_are_independent() {
        let (store, manager, first_customer) = setup().await;
        let second_customer = add_customer(&store).await;

        let a = manager.add(first_customer, card("1111", false)).await.unwrap();
        let b = manager.add(second_customer, card("2222", true)).await.unwrap();

        assert_eq!(default_ids(&store, first_customer).await, vec![a.id]);
        assert_eq!(default_ids(&store, second_customer).await, vec![b.id]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_single_default_under_concurrent_writes() {
        let (store, manager, customer) = setup().await;
        let manager = Arc::new(manager);

        let adds: Vec<_> = (0..40)
            .map(|i| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move {
                    manager
                        .add(customer, card(&format!("4000{i:04}"), i % 3 == 0))
                        .await
                        .unwrap()
                        .id
                })
            })
            .collect();
        let mut ids = Vec::new();
        for task in adds {
            ids.push(task.await.unwrap());
        }
        assert_eq!(default_ids(&store, customer).await.len(), 1);

        let mutations: Vec<_> = ids
            .iter()
            .enumerate()
            .map(|(i, &id)| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move {
                    if i % 2 == 0 {
                        manager.delete(id).await
                    } else {
                        manager
                            .update(
                                id,
                                PaymentMethodPatch {
                                    is_default: Some(true),
                                    ..Default::default()
                                },
                            )
                            .await
                            .map(|_| ())
                    }
                })
            })
            .collect();
        for result in futures::future::join_all(mutations).await {
            result.unwrap().unwrap();
        }

        let remaining = manager.list_for_customer(customer).await.unwrap();
        assert_eq!(remaining.len(), 20);
        assert_eq!(remaining.iter().filter(|m| m.is_default).count(), 1);
        assert!(remaining[0].is_default);

        for method in remaining {
            manager.delete(method.id).await.unwrap();
            let defaults = default_ids(&store, customer).await;
            let left = store.find_payment_methods_by_customer(customer).await.unwrap();
            assert_eq!(defaults.len(), usize::from(!left.is_empty()));
        }
    }
}
