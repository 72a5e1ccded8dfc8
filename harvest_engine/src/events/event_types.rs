use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType, Payment, TransitionTrigger};

/// A customer checked out and the order was committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// An order moved from `old_status` to `order.status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub old_status: OrderStatusType,
    pub order: Order,
    pub triggered_by: TransitionTrigger,
}

impl OrderStatusChangedEvent {
    pub fn new(old_status: OrderStatusType, order: Order, triggered_by: TransitionTrigger) -> Self {
        Self { old_status, order, triggered_by }
    }

    pub fn new_status(&self) -> OrderStatusType {
        self.order.status
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCompletedEvent {
    pub payment: Payment,
    pub order: Order,
}

impl PaymentCompletedEvent {
    pub fn new(payment: Payment, order: Order) -> Self {
        Self { payment, order }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRefundedEvent {
    pub payment: Payment,
    pub order: Order,
    /// True when the refund covered the whole payment.
    pub full_refund: bool,
}

impl PaymentRefundedEvent {
    pub fn new(payment: Payment, order: Order, full_refund: bool) -> Self {
        Self { payment, order, full_refund }
    }
}

#[derive(Debug, Clone)]
pub enum EventType {
    OrderCreated(OrderCreatedEvent),
    OrderStatusChanged(OrderStatusChangedEvent),
    PaymentCompleted(PaymentCompletedEvent),
    PaymentRefunded(PaymentRefundedEvent),
}
