use crate::{
    db_types::{NewOrder, Order, OrderId},
    market_api::{
        errors::MarketError,
        order_objects::{OrderChanged, OrderOwner, OrderQueryFilter, OrderStats, StatusUpdate},
    },
};

#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Places an order in a single atomic transaction:
    /// * every line's quantity is reserved from inventory. If any line cannot be reserved, the whole checkout fails
    ///   and no stock changes.
    /// * every product must be listed by `order.producer_id` and available, otherwise the checkout fails with
    ///   `ProductUnavailable`.
    /// * the current price of each product is captured on its order line, and the order total is the sum of the
    ///   line totals.
    /// * the order is stored as `pending`, with a first status history entry.
    ///
    /// Returns the stored order, including its items and history.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, MarketError>;

    /// Fetches an order with its items and status history.
    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, MarketError>;

    /// Fetches a page of orders (without items or history) matching the filter, newest first.
    async fn fetch_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, MarketError>;

    /// Counts the owner's orders by status and totals their value, in a single aggregate query. Cancelled orders are
    /// counted but do not contribute to the totals. An owner with no orders gets all zeroes.
    async fn fetch_order_stats(&self, owner: OrderOwner) -> Result<OrderStats, MarketError>;

    /// Moves an order to a new status, atomically:
    /// * the change is checked against the order state machine for the update's trigger. Rejected changes leave the
    ///   order untouched.
    /// * if `update.owner` is set and does not own the order, `OrderNotFound` is returned.
    /// * a status history entry is appended.
    /// * if the new status is `cancelled`, every line's quantity is released back to inventory.
    ///
    /// Two concurrent updates to the same order are serialised. The second is evaluated against the status written
    /// by the first.
    ///
    /// If the state machine says the order is already where the update would put it, nothing is written and the
    /// returned [`OrderChanged`] reports no change.
    async fn update_order_status(&self, update: StatusUpdate) -> Result<OrderChanged, MarketError>;
}
