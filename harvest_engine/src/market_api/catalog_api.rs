use std::fmt::Debug;

use harvest_common::Money;
use log::*;

use crate::{
    db::traits::{CatalogManagement, InventoryLedger},
    db_types::{NewProduct, Product, ProductId, ProductUpdate},
    market_api::errors::MarketError,
};

/// `CatalogApi` manages producer listings. Stock levels can be read here, but only change through checkout and
/// cancellation.
pub struct CatalogApi<B> {
    db: B,
}

impl<B> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi")
    }
}

impl<B> CatalogApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement + InventoryLedger
{
    pub async fn add_product(&self, product: NewProduct) -> Result<Product, MarketError> {
        if product.name.trim().is_empty() {
            return Err(MarketError::InvalidProduct("Products must have a name".to_string()));
        }
        if !product.price.is_positive() {
            return Err(MarketError::InvalidProduct(format!("Price must be positive, but was {}", product.price)));
        }
        if product.stock_quantity < 0 {
            return Err(MarketError::InvalidProduct(format!(
                "Stock cannot be negative, but was {}",
                product.stock_quantity
            )));
        }
        let product = self.db.insert_product(product).await?;
        info!("📦️ {} ({}) listed with {} in stock", product.id, product.name, product.stock_quantity);
        Ok(product)
    }

    pub async fn fetch_product(&self, id: ProductId) -> Result<Product, MarketError> {
        self.db.fetch_product(id).await?.ok_or(MarketError::ProductNotFound(id))
    }

    pub async fn products_for_producer(&self, producer_id: i64) -> Result<Vec<Product>, MarketError> {
        self.db.fetch_products_for_producer(producer_id).await
    }

    /// Changes the price and/or availability of a listing. Both changes are written together, or not at all.
    ///
    /// A new price must be positive. An empty update writes nothing and returns the product as it stands.
    pub async fn update_listing(&self, id: ProductId, update: ProductUpdate) -> Result<Product, MarketError> {
        if let Some(price) = update.price {
            if !price.is_positive() {
                return Err(MarketError::InvalidProduct(format!("Price must be positive, but was {price}")));
            }
        }
        if update.is_empty() {
            return self.fetch_product(id).await;
        }
        let product = self.db.update_product(id, update).await?;
        info!("📦️ {id} updated: price {}, available: {}", product.price, product.is_available);
        Ok(product)
    }

    pub async fn set_availability(&self, id: ProductId, is_available: bool) -> Result<Product, MarketError> {
        self.update_listing(id, ProductUpdate::default().with_availability(is_available)).await
    }

    /// Changes the list price of a product. Existing orders keep the price they were placed at.
    pub async fn update_price(&self, id: ProductId, price: Money) -> Result<Product, MarketError> {
        self.update_listing(id, ProductUpdate::default().with_price(price)).await
    }

    pub async fn stock_level(&self, id: ProductId) -> Result<i64, MarketError> {
        self.db.stock_level(id).await?.ok_or(MarketError::ProductNotFound(id))
    }
}
