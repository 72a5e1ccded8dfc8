use crate::{
    db_types::{NewPayment, Payment, PaymentId, PaymentStatus},
    market_api::{
        errors::MarketError,
        payment_objects::{PaymentDetails, PaymentQueryFilter, PaymentStats, PaymentUpdate, Refund, RefundResult},
    },
};

#[allow(async_fn_in_trait)]
pub trait PaymentManagement {
    /// Records a new `pending` payment against an order.
    ///
    /// The order must exist and must not be cancelled, and the payment amount must equal the order total to within
    /// [`crate::db_types::PAYMENT_TOLERANCE`].
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, MarketError>;

    async fn fetch_payment(&self, id: PaymentId) -> Result<Option<PaymentDetails>, MarketError>;

    /// Fetches a page of payments matching the filter, newest first.
    async fn fetch_payments(&self, filter: PaymentQueryFilter) -> Result<Vec<PaymentDetails>, MarketError>;

    /// Payment counts and amounts over every order placed by the customer, in a single aggregate query.
    async fn fetch_payment_stats(&self, customer_id: i64) -> Result<PaymentStats, MarketError>;

    /// Changes a payment's status, atomically with its effect on the order.
    ///
    /// * `pending -> completed` settles the payment. A pending order is confirmed. Orders further along are left
    ///   alone. Completing a payment for a cancelled order fails with `OrderCancelled` and leaves the payment pending.
    ///   At most one payment per order can be completed.
    /// * `pending -> failed` marks the payment failed. The order is not touched.
    /// * Requesting the payment's current status is a no-op.
    /// * Anything else is an `InvalidPaymentTransition`. Refunds go through [`Self::refund_payment`].
    ///
    /// `transaction_id`, if given, is stored with the payment when its status changes.
    async fn update_payment_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        transaction_id: Option<String>,
    ) -> Result<PaymentUpdate, MarketError>;

    /// Refunds a completed payment, atomically:
    /// * the payment moves to `refunded`, recording the refund amount and reason.
    /// * if the refund covers the whole payment, the order is cancelled (releasing its inventory) unless it is
    ///   already completed or cancelled.
    /// * a partial refund does not affect the order.
    async fn refund_payment(&self, refund: Refund) -> Result<RefundResult, MarketError>;
}
