use harvest_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    db_types::{OrderId, OrderStatusType, Payment, PaymentId, PaymentStatus},
    market_api::order_objects::{OrderChanged, Pagination},
};

/// A request to refund some or all of a completed payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub payment_id: PaymentId,
    pub amount: Money,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Refund {
    pub fn new(payment_id: PaymentId, amount: Money) -> Self {
        Self { payment_id, amount, reason: None }
    }

    pub fn with_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// The outcome of a payment status change, together with the effect it had on the order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentUpdate {
    pub old_status: PaymentStatus,
    pub payment: Payment,
    /// Present when the payment belongs to an order that was reloaded as part of the update.
    pub order: Option<OrderChanged>,
}

impl PaymentUpdate {
    pub fn is_changed(&self) -> bool {
        self.old_status != self.payment.status
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundResult {
    pub payment: Payment,
    pub order: OrderChanged,
    pub full_refund: bool,
}

/// A payment along with a summary of the order it pays for.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PaymentDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub payment: Payment,
    pub order_total: Money,
    pub order_status: OrderStatusType,
    pub customer_id: i64,
    pub producer_id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentQueryFilter {
    pub customer_id: Option<i64>,
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub pagination: Pagination,
}

impl PaymentQueryFilter {
    pub fn with_customer_id(mut self, customer_id: i64) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }
}

/// Payment counts and amounts across all of a customer's orders.
///
/// `total_paid` and `average_payment` only count completed payments. `total_refunded` sums what has been given back.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PaymentStats {
    pub total_payments: i64,
    pub pending_payments: i64,
    pub successful_payments: i64,
    pub failed_payments: i64,
    pub refunded_payments: i64,
    pub total_paid: Money,
    pub average_payment: Money,
    pub total_refunded: Money,
}
