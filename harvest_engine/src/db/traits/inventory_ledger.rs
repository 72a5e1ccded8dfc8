use crate::{db_types::ProductId, market_api::errors::MarketError};

/// Per-product stock counts.
///
/// Implementations must guarantee that concurrent reservations against the same product never drive its stock below
/// zero: a reservation either succeeds in full, or fails with [`MarketError::OutOfStock`] and leaves the stock
/// untouched.
#[allow(async_fn_in_trait)]
pub trait InventoryLedger {
    /// Atomically takes `quantity` units of `product_id` out of stock, if at least that many are available.
    async fn reserve(&self, product_id: ProductId, quantity: i64) -> Result<(), MarketError>;

    /// Returns `quantity` units of `product_id` to stock.
    async fn release(&self, product_id: ProductId, quantity: i64) -> Result<(), MarketError>;

    /// The current stock count, or `None` if the product does not exist.
    async fn stock_level(&self, product_id: ProductId) -> Result<Option<i64>, MarketError>;
}
