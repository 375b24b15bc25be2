//! Entry point for the outer request layer. Every operation returns a value
//! or a [`CatalogError`], with no other side channel.

use crate::core::config::AppConfig;
use crate::core::currency::CurrencyRegistry;
use crate::core::error::{CatalogError, Result};
use crate::core::model::{
    Comment, Customer, CustomerId, NewCustomer, NewPaymentMethod, NewProduct, PaymentMethod,
    PaymentMethodId, PaymentMethodPatch, PriceAuditEntry, Product, ProductId, ReferenceId,
};
use crate::core::money::Money;
use crate::core::price::{Conversion, PriceConverter};
use crate::core::store::{CatalogStore, CustomerStore};
use crate::services::{PaymentMethodManager, PriceAuditLog, ProductPricingService, ProductQuote};
use crate::store::{self, MemoryStore};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

pub struct Catalog {
    converter: PriceConverter,
    pricing: ProductPricingService,
    payments: PaymentMethodManager,
    customers: Arc<dyn CustomerStore>,
}

impl Catalog {
    pub fn new<S: CatalogStore + 'static>(registry: CurrencyRegistry, store: Arc<S>) -> Self {
        let converter = PriceConverter::new(Arc::new(registry));
        let audit = PriceAuditLog::new(store.clone());
        let pricing = ProductPricingService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            converter.clone(),
            audit,
        );
        let payments = PaymentMethodManager::new(store.clone(), store.clone());
        Self {
            converter,
            pricing,
            payments,
            customers: store,
        }
    }

    pub fn from_config<S: CatalogStore + 'static>(config: &AppConfig, store: Arc<S>) -> Result<Self> {
        let registry = CurrencyRegistry::with_rates(&config.base_currency, &config.rates)?;
        Ok(Self::new(registry, store))
    }

    /// Opens the catalog on the durable store under the configured data path.
    pub fn open(config: &AppConfig) -> anyhow::Result<Self> {
        let store = Arc::new(store::open_disk_store(config)?);
        Ok(Self::from_config(config, store)?)
    }

    pub fn in_memory(config: &AppConfig) -> Result<Self> {
        Self::from_config(config, Arc::new(MemoryStore::new()))
    }

    fn registry(&self) -> &CurrencyRegistry {
        self.converter.registry()
    }

    // Currencies

    pub fn base_currency(&self) -> &str {
        self.registry().base_code()
    }

    pub fn list_currencies(&self) -> BTreeMap<String, Decimal> {
        self.registry().rates()
    }

    pub fn add_currency(&self, code: &str, rate: Decimal) -> Result<()> {
        self.registry().insert(code, rate)
    }

    pub fn set_rate(&self, code: &str, rate: Decimal) -> Result<()> {
        self.registry().upsert(code, rate)
    }

    pub fn convert(&self, amount: Money, target: &str) -> Result<Conversion> {
        self.converter.convert(amount, target)
    }

    // Products

    pub async fn add_product(&self, new: NewProduct) -> Result<Product> {
        self.pricing.add_product(new).await
    }

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        self.pricing.list_active_products().await
    }

    pub async fn update_price(
        &self,
        product_id: ProductId,
        new_price: Money,
        currency_code: &str,
        actor: Option<&str>,
    ) -> Result<Product> {
        self.pricing
            .update_price(product_id, new_price, currency_code, actor)
            .await
    }

    pub async fn get_converted_price(
        &self,
        product_id: ProductId,
        currency_code: &str,
    ) -> Result<ProductQuote> {
        self.pricing.get_with_currency(product_id, currency_code).await
    }

    pub async fn price_history(&self, product_id: ProductId) -> Result<Vec<PriceAuditEntry>> {
        self.pricing.price_history(product_id).await
    }

    pub async fn update_stock(&self, product_id: ProductId, stock: i64) -> Result<Product> {
        self.pricing.update_stock(product_id, stock).await
    }

    pub async fn remove_product(&self, product_id: ProductId) -> Result<usize> {
        self.pricing.remove_product(product_id).await
    }

    pub async fn inventory_by_model(&self) -> Result<BTreeMap<ReferenceId, u64>> {
        self.pricing.inventory_by_model().await
    }

    pub async fn add_comment(
        &self,
        product_id: ProductId,
        customer_id: CustomerId,
        rating: u8,
        body: &str,
    ) -> Result<Comment> {
        self.pricing
            .add_comment(product_id, customer_id, rating, body)
            .await
    }

    pub async fn comments_for(&self, product_id: ProductId) -> Result<Vec<Comment>> {
        self.pricing.comments_for(product_id).await
    }

    // Customers

    pub async fn register_customer(&self, new: NewCustomer) -> Result<Customer> {
        for (field, value) in [
            ("name", &new.name),
            ("surname", &new.surname),
            ("email", &new.email),
        ] {
            if value.trim().is_empty() {
                return Err(CatalogError::invalid(format!("{field} must not be blank")));
            }
        }
        if !new.email.contains('@') {
            return Err(CatalogError::invalid(format!(
                "'{}' is not an email address",
                new.email
            )));
        }

        let now = Utc::now();
        let customer = Customer {
            id: self.customers.next_customer_id().await?,
            name: new.name.trim().to_string(),
            surname: new.surname.trim().to_string(),
            email: new.email.trim().to_string(),
            phone_number: new.phone_number,
            address: new.address,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.customers.save_customer(&customer).await?;
        info!(id = customer.id, "Customer registered");
        Ok(customer)
    }

    pub async fn get_customer(&self, id: CustomerId) -> Result<Customer> {
        self.customers
            .find_customer(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("customer", id))
    }

    // Payment methods

    pub async fn add_payment_method(
        &self,
        customer_id: CustomerId,
        method: NewPaymentMethod,
    ) -> Result<PaymentMethod> {
        self.payments.add(customer_id, method).await
    }

    pub async fn update_payment_method(
        &self,
        id: PaymentMethodId,
        patch: PaymentMethodPatch,
    ) -> Result<PaymentMethod> {
        self.payments.update(id, patch).await
    }

    pub async fn delete_payment_method(&self, id: PaymentMethodId) -> Result<()> {
        self.payments.delete(id).await
    }

    pub async fn get_payment_method(&self, id: PaymentMethodId) -> Result<PaymentMethod> {
        self.payments.get(id).await
    }

    pub async fn get_default_payment_method(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<PaymentMethod>> {
        self.payments.get_default(customer_id).await
    }

    pub async fn list_payment_methods(&self, customer_id: CustomerId) -> Result<Vec<PaymentMethod>> {
        self.payments.list_for_customer(customer_id).await
    }
}
