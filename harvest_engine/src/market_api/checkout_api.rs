use std::{collections::HashMap, fmt::Debug};

use log::*;

use crate::{
    db::traits::{CatalogManagement, OrderManagement},
    db_types::{DeliveryType, NewOrder, Order, Product, ProductId},
    events::{EventProducers, OrderCreatedEvent},
    market_api::errors::MarketError,
};

/// `CheckoutApi` turns a customer's cart into a placed order.
pub struct CheckoutApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for CheckoutApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi")
    }
}

impl<B> CheckoutApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> CheckoutApi<B>
where B: CatalogManagement + OrderManagement
{
    /// Places an order for the cart in `order`.
    ///
    /// The cart is checked before anything is written, failing on the first problem found, in this order:
    /// 1. every product must exist, be listed by `order.producer_id`, and be available (`ProductUnavailable`).
    /// 2. every quantity must be at least 1, and the cart must not be empty (`InvalidQuantity`).
    /// 3. delivery orders need a non-blank address (`MissingDeliveryAddress`).
    ///
    /// The order is then placed atomically by the backend, which reserves stock for every line and captures current
    /// prices. If any line cannot be reserved the checkout fails with `OutOfStock` and no stock is taken.
    ///
    /// On success the new `pending` order is returned and an [`OrderCreatedEvent`] is published.
    pub async fn checkout(&self, order: NewOrder) -> Result<Order, MarketError> {
        trace!("🛒️ Checkout for customer {} with producer {}", order.customer_id, order.producer_id);
        let ids = order.items.iter().map(|l| l.product_id).collect::<Vec<ProductId>>();
        let products = self.db.fetch_products(&ids).await?;
        validate_cart(&order, &products)?;
        let order = self.db.insert_order(order).await?;
        info!("🛒️ {} placed by customer {}. Total: {}", order.id, order.customer_id, order.total_amount);
        self.call_order_created_hook(&order).await;
        Ok(order)
    }

    async fn call_order_created_hook(&self, order: &Order) {
        for emitter in &self.producers.order_created_producer {
            debug!("🛒️ Notifying order created hook subscribers");
            emitter.publish_event(OrderCreatedEvent::new(order.clone())).await;
        }
    }
}

/// Checks a cart against the current listings. `products` holds whatever the catalog returned for the cart's ids.
pub fn validate_cart(order: &NewOrder, products: &[Product]) -> Result<(), MarketError> {
    let listings = products.iter().map(|p| (p.id, p)).collect::<HashMap<ProductId, &Product>>();
    for line in &order.items {
        match listings.get(&line.product_id) {
            Some(p) if p.is_orderable_from(order.producer_id) => {},
            _ => return Err(MarketError::ProductUnavailable(line.product_id)),
        }
    }
    if order.items.is_empty() {
        return Err(MarketError::InvalidQuantity("The cart is empty".to_string()));
    }
    if let Some(line) = order.items.iter().find(|l| l.quantity < 1) {
        return Err(MarketError::InvalidQuantity(format!(
            "{} has quantity {}. Quantities must be at least 1",
            line.product_id, line.quantity
        )));
    }
    if order.delivery_type == DeliveryType::Delivery && order.address().is_none() {
        return Err(MarketError::MissingDeliveryAddress);
    }
    Ok(())
}
