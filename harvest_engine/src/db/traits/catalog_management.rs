use crate::{
    db_types::{NewProduct, Product, ProductId, ProductUpdate},
    market_api::errors::MarketError,
};

#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    /// Adds a new product listing.
    async fn insert_product(&self, product: NewProduct) -> Result<Product, MarketError>;

    async fn fetch_product(&self, id: ProductId) -> Result<Option<Product>, MarketError>;

    /// Fetches the products with the given ids. Missing ids are silently skipped.
    async fn fetch_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, MarketError>;

    /// All listings for the given producer, ordered by id.
    async fn fetch_products_for_producer(&self, producer_id: i64) -> Result<Vec<Product>, MarketError>;

    /// Changes the price and availability of a listing in a single write. Fields the update leaves as `None` are not
    /// touched. Orders already placed keep the price captured at checkout.
    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<Product, MarketError>;
}
