use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::OrderManagement,
    db_types::{Order, OrderId, OrderStatusType, TransitionTrigger},
    events::{EventProducers, OrderStatusChangedEvent},
    market_api::{
        errors::MarketError,
        order_objects::{OrderChanged, OrderOwner, OrderQueryFilter, OrderStats, StatusUpdate},
    },
};

/// `OrderFlowApi` moves orders through fulfilment, handles cancellations, and answers order queries.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement
{
    /// Fetches an order with its items and status history.
    pub async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, MarketError> {
        self.db.fetch_order(id).await
    }

    /// A page of the customer's orders, newest first, optionally restricted to some statuses.
    pub async fn orders_for_customer(
        &self,
        customer_id: i64,
        filter: OrderQueryFilter,
    ) -> Result<Vec<Order>, MarketError> {
        self.db.fetch_orders(filter.with_customer_id(customer_id)).await
    }

    /// A page of orders placed with the producer, newest first, optionally restricted to some statuses.
    pub async fn orders_for_producer(
        &self,
        producer_id: i64,
        filter: OrderQueryFilter,
    ) -> Result<Vec<Order>, MarketError> {
        self.db.fetch_orders(filter.with_producer_id(producer_id)).await
    }

    pub async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, MarketError> {
        self.db.fetch_orders(filter).await
    }

    /// Order counts by status, with the total and average value of the orders that were not cancelled. For a customer
    /// this is what they have spent, for a producer what they have taken.
    pub async fn order_stats(&self, owner: OrderOwner) -> Result<OrderStats, MarketError> {
        let stats = self.db.fetch_order_stats(owner).await?;
        trace!("🔄️ {owner:?} has {} orders worth {}", stats.total_orders, stats.total_amount);
        Ok(stats)
    }

    /// Moves an order along the fulfilment chain on behalf of its producer.
    ///
    /// Transitions follow the table in [`crate::order_status`]:
    ///
    /// | From \ To | confirmed | preparing | ready | completed | cancelled |
    /// |-----------|-----------|-----------|-------|-----------|-----------|
    /// | pending   | ok        | ok        | ok    | ok        | ok (1)    |
    /// | confirmed | Err       | ok        | ok    | ok        | Err       |
    /// | preparing | Err       | Err       | ok    | ok        | Err       |
    /// | ready     | Err       | Err       | Err   | ok        | Err       |
    /// | completed | Err       | Err       | Err   | Err       | Err       |
    /// | cancelled | Err       | Err       | Err   | Err       | Err       |
    ///
    /// (1) Cancelling returns the order's reserved stock to inventory.
    ///
    /// Rejected transitions fail with `InvalidTransition` and leave the order untouched. If `producer_id` is given,
    /// orders from other producers are reported as `OrderNotFound`. Every applied change appends a status history
    /// entry carrying `note` (or a default note), and publishes an [`OrderStatusChangedEvent`].
    pub async fn update_status(
        &self,
        order_id: OrderId,
        new_status: OrderStatusType,
        producer_id: Option<i64>,
        note: Option<String>,
    ) -> Result<Order, MarketError> {
        let note = note.unwrap_or_else(|| format!("Status updated to {new_status}"));
        let mut update =
            StatusUpdate::new(order_id, new_status, TransitionTrigger::ProducerUpdate).with_note(note);
        if let Some(id) = producer_id {
            update = update.owned_by(OrderOwner::Producer(id));
        }
        let changed = self.db.update_order_status(update).await.map_err(|e| {
            debug!("🔄️ Could not move {order_id} to {new_status}: {e}");
            e
        })?;
        info!("🔄️ {order_id} moved from {} to {new_status}", changed.old_status);
        self.call_status_changed_hook(&changed, TransitionTrigger::ProducerUpdate).await;
        Ok(changed.order)
    }

    /// Cancels a pending order on behalf of the customer who placed it, returning its reserved stock to inventory.
    ///
    /// Orders that are past `pending` fail with `NotCancellable`. Orders belonging to another customer are reported as
    /// `OrderNotFound`.
    pub async fn cancel_order(&self, order_id: OrderId, customer_id: i64) -> Result<Order, MarketError> {
        let update = StatusUpdate::new(order_id, OrderStatusType::Cancelled, TransitionTrigger::CustomerCancel)
            .owned_by(OrderOwner::Customer(customer_id))
            .with_note("Cancelled by customer");
        let changed = self.db.update_order_status(update).await?;
        info!("🔄️ {order_id} cancelled by customer {customer_id}");
        self.call_status_changed_hook(&changed, TransitionTrigger::CustomerCancel).await;
        Ok(changed.order)
    }

    async fn call_status_changed_hook(&self, changed: &OrderChanged, trigger: TransitionTrigger) {
        publish_status_change(&self.producers, changed, trigger).await;
    }
}

/// Publishes an [`OrderStatusChangedEvent`] if `changed` records an actual change.
pub(crate) async fn publish_status_change(
    producers: &EventProducers,
    changed: &OrderChanged,
    trigger: TransitionTrigger,
) {
    if !changed.is_changed() {
        return;
    }
    for emitter in &producers.order_status_changed_producer {
        debug!("🔄️ Notifying order status changed hook subscribers");
        let event = OrderStatusChangedEvent::new(changed.old_status, changed.order.clone(), trigger);
        emitter.publish_event(event).await;
    }
}
