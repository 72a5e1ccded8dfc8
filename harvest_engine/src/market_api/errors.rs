use harvest_common::Money;
use thiserror::Error;

use crate::db_types::{OrderId, OrderStatusType, PaymentId, PaymentStatus, ProductId};
use crate::order_status::TransitionError;

/// Broad classes of [`MarketError`], so that callers can map errors onto their own conventions (e.g. HTTP status
/// codes) without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request was malformed or failed validation. Nothing was changed.
    Validation,
    /// The thing the request refers to does not exist (or is not visible to the caller).
    NotFound,
    /// The request is well-formed, but conflicts with the current state of an order, payment or product.
    Conflict,
    /// Storage failed. The operation was rolled back.
    Internal,
}

#[derive(Debug, Clone, Error)]
pub enum MarketError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid product: {0}")]
    InvalidProduct(String),
    #[error("{0} does not exist")]
    ProductNotFound(ProductId),
    #[error("{0} is not available from this producer")]
    ProductUnavailable(ProductId),
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
    #[error("A delivery address is required for delivery orders")]
    MissingDeliveryAddress,
    #[error("Insufficient stock for {product_id}. Requested {requested}, but only {available} are available")]
    OutOfStock { product_id: ProductId, requested: i64, available: i64 },
    #[error("{0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Cannot move an order from {from} to {to}")]
    InvalidTransition { from: OrderStatusType, to: OrderStatusType },
    #[error("{0} is {1}. Only pending orders can be cancelled")]
    NotCancellable(OrderId, OrderStatusType),
    #[error("{0} has been cancelled")]
    OrderCancelled(OrderId),
    #[error("Payment amount {received} does not match the order total of {expected}")]
    AmountMismatch { expected: Money, received: Money },
    #[error("Payment amount must be positive, but was {0}")]
    InvalidPaymentAmount(Money),
    #[error("{0} does not exist")]
    PaymentNotFound(PaymentId),
    #[error("Cannot change a payment from {from} to {to}")]
    InvalidPaymentTransition { from: PaymentStatus, to: PaymentStatus },
    #[error("{0} already has a completed payment")]
    PaymentAlreadyCompleted(OrderId),
    #[error("{0} is {1}. Only completed payments can be refunded")]
    PaymentNotCompleted(PaymentId, PaymentStatus),
    #[error("Refund amount must be positive, but was {0}")]
    InvalidRefundAmount(Money),
    #[error("Refund of {refund} exceeds the payment amount of {paid}")]
    RefundExceedsPayment { refund: Money, paid: Money },
    #[error("Invalid query: {0}")]
    QueryError(String),
}

impl MarketError {
    pub fn kind(&self) -> ErrorKind {
        use MarketError::*;
        match self {
            DatabaseError(_) => ErrorKind::Internal,
            InvalidProduct(_)
            | ProductUnavailable(_)
            | InvalidQuantity(_)
            | MissingDeliveryAddress
            | InvalidPaymentAmount(_)
            | InvalidRefundAmount(_)
            | QueryError(_) => ErrorKind::Validation,
            ProductNotFound(_) | OrderNotFound(_) | PaymentNotFound(_) => ErrorKind::NotFound,
            OutOfStock { .. }
            | AmountMismatch { .. }
            | RefundExceedsPayment { .. }
            | InvalidTransition { .. }
            | NotCancellable(..)
            | OrderCancelled(_)
            | InvalidPaymentTransition { .. }
            | PaymentAlreadyCompleted(_)
            | PaymentNotCompleted(..) => ErrorKind::Conflict,
        }
    }

    /// Converts a state machine rejection into the error reported for `order_id`.
    pub fn from_transition(order_id: OrderId, err: TransitionError) -> Self {
        match err {
            TransitionError::Terminal { from, to } | TransitionError::Invalid { from, to } => {
                Self::InvalidTransition { from, to }
            },
            TransitionError::NotCancellable(status) => Self::NotCancellable(order_id, status),
        }
    }
}

impl From<sqlx::Error> for MarketError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}
