//! Product price mutation and the product operations around it

use crate::core::error::{CatalogError, Result};
use crate::core::lock::KeyedLocks;
use crate::core::model::{
    Comment, CustomerId, NewProduct, PriceAuditEntry, Product, ProductId, ReferenceId,
};
use crate::core::money::{Money, ensure_non_negative, round_money};
use crate::core::price::PriceConverter;
use crate::core::store::{CommentStore, CustomerStore, ProductStore};
use crate::services::audit::PriceAuditLog;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub const MAX_COMMENT_LEN: usize = 500;

/// A product together with its price in a display currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductQuote {
    pub product: Product,
    pub converted_price: Money,
    pub currency_code: String,
}

pub struct ProductPricingService {
    products: Arc<dyn ProductStore>,
    comments: Arc<dyn CommentStore>,
    customers: Arc<dyn CustomerStore>,
    converter: PriceConverter,
    audit: PriceAuditLog,
    locks: KeyedLocks<ProductId>,
}

impl ProductPricingService {
    pub fn new(
        products: Arc<dyn ProductStore>,
        comments: Arc<dyn CommentStore>,
        customers: Arc<dyn CustomerStore>,
        converter: PriceConverter,
        audit: PriceAuditLog,
    ) -> Self {
        Self {
            products,
            comments,
            customers,
            converter,
            audit,
            locks: KeyedLocks::new(),
        }
    }

    async fn load(&self, id: ProductId) -> Result<Product> {
        self.products
            .find_product(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("product", id))
    }

    /// Sets a new price given in `currency_code`. The stored price and its
    /// audit entry are written together, in base currency.
    #[instrument(skip(self, new_price), fields(price = %new_price))]
    pub async fn update_price(
        &self,
        product_id: ProductId,
        new_price: Money,
        currency_code: &str,
        actor: Option<&str>,
    ) -> Result<Product> {
        ensure_non_negative(new_price)?;

        let _guard = self.locks.lock(product_id).await;
        let mut product = self.load(product_id).await?;
        let converted = round_money(self.converter.to_base(new_price, currency_code)?);

        let now = Utc::now();
        let entry = PriceAuditEntry {
            id: 0,
            product_id,
            old_price: product.price,
            new_price: converted,
            currency: self.converter.registry().base_code().to_string(),
            changed_by: actor.map(str::to_string),
            changed_at: now,
        };
        product.price = converted;
        product.updated_at = now;

        let entry = self.audit.record_with_price(entry, &product).await?;
        info!(
            old = %entry.old_price,
            new = %entry.new_price,
            entry = entry.id,
            "Product price changed"
        );
        Ok(product)
    }

    pub async fn get_with_currency(&self, product_id: ProductId, code: &str) -> Result<ProductQuote> {
        let product = self.load(product_id).await?;
        let converted_price = self.converter.to_display(product.price, code)?;
        Ok(ProductQuote {
            product,
            converted_price,
            currency_code: code.to_string(),
        })
    }

    pub async fn price_history(&self, product_id: ProductId) -> Result<Vec<PriceAuditEntry>> {
        self.audit.history_for(product_id).await
    }

    pub async fn update_stock(&self, product_id: ProductId, new_stock: i64) -> Result<Product> {
        if new_stock < 0 {
            return Err(CatalogError::invalid("stock cannot be negative"));
        }
        let stock = u32::try_from(new_stock)
            .map_err(|_| CatalogError::invalid(format!("stock {new_stock} is too large")))?;

        let _guard = self.locks.lock(product_id).await;
        let mut product = self.load(product_id).await?;
        product.stock = stock;
        product.updated_at = Utc::now();
        self.products.save_product(&product).await?;
        debug!(product_id, stock, "Updated stock");
        Ok(product)
    }

    pub async fn add_product(&self, new: NewProduct) -> Result<Product> {
        ensure_non_negative(new.price)?;
        let now = Utc::now();
        let product = Product {
            id: self.products.next_product_id().await?,
            model_id: new.model_id,
            color_id: new.color_id,
            package_type_id: new.package_type_id,
            price: round_money(new.price),
            stock: new.stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.products.save_product(&product).await?;
        info!(id = product.id, price = %product.price, "Product added");
        Ok(product)
    }

    /// Removes the product and its comments in one write. Price history is
    /// kept. Returns the number of removed comments.
    pub async fn remove_product(&self, product_id: ProductId) -> Result<usize> {
        let _guard = self.locks.lock(product_id).await;
        self.load(product_id).await?;
        let removed = self.products.remove_product_cascade(product_id).await?;
        info!(product_id, comments = removed, "Product removed");
        Ok(removed)
    }

    pub async fn list_active_products(&self) -> Result<Vec<Product>> {
        let products = self.products.list_products().await?;
        Ok(products.into_iter().filter(|p| p.is_active).collect())
    }

    /// Total stock of active products per car model.
    pub async fn inventory_by_model(&self) -> Result<BTreeMap<ReferenceId, u64>> {
        let mut inventory = BTreeMap::new();
        for product in self.list_active_products().await? {
            *inventory.entry(product.model_id).or_insert(0) += u64::from(product.stock);
        }
        Ok(inventory)
    }

    pub async fn add_comment(
        &self,
        product_id: ProductId,
        customer_id: CustomerId,
        rating: u8,
        body: &str,
    ) -> Result<Comment> {
        if !(1..=5).contains(&rating) {
            return Err(CatalogError::invalid(format!(
                "rating must be between 1 and 5, got {rating}"
            )));
        }
        let body = body.trim();
        if body.is_empty() || body.chars().count() > MAX_COMMENT_LEN {
            return Err(CatalogError::invalid(format!(
                "comment must be 1 to {MAX_COMMENT_LEN} characters"
            )));
        }

        // Held so a concurrent removal cannot orphan the comment.
        let _guard = self.locks.lock(product_id).await;
        self.load(product_id).await?;
        if self.customers.find_customer(customer_id).await?.is_none() {
            return Err(CatalogError::not_found("customer", customer_id));
        }

        let comment = Comment {
            id: self.comments.next_comment_id().await?,
            product_id,
            customer_id,
            body: body.to_string(),
            rating,
            is_approved: false,
            created_at: Utc::now(),
        };
        self.comments.save_comment(&comment).await?;
        Ok(comment)
    }

    pub async fn comments_for(&self, product_id: ProductId) -> Result<Vec<Comment>> {
        Ok(self.comments.find_comments_by_product(product_id).await?)
    }
}
