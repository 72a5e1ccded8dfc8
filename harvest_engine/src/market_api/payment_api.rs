use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::PaymentManagement,
    db_types::{NewPayment, Order, OrderId, Payment, PaymentId, PaymentStatus, TransitionTrigger},
    events::{EventProducers, PaymentCompletedEvent, PaymentRefundedEvent},
    market_api::{
        errors::MarketError,
        order_flow_api::publish_status_change,
        order_objects::{Pagination, MAX_PAGE_SIZE},
        payment_objects::{PaymentDetails, PaymentQueryFilter, PaymentStats, PaymentUpdate, Refund, RefundResult},
    },
};

/// `PaymentApi` records payments against orders and keeps orders in step with what the payment processor reports.
pub struct PaymentApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for PaymentApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentApi")
    }
}

impl<B> PaymentApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> PaymentApi<B>
where B: PaymentManagement
{
    /// Records a new `pending` payment for an order.
    ///
    /// The amount must be positive (`InvalidPaymentAmount`) and match the order total to within one minor unit
    /// (`AmountMismatch`). The order must exist (`OrderNotFound`) and must not be cancelled (`OrderCancelled`).
    pub async fn create_payment(&self, payment: NewPayment) -> Result<Payment, MarketError> {
        if !payment.amount.is_positive() {
            return Err(MarketError::InvalidPaymentAmount(payment.amount));
        }
        let order_id = payment.order_id;
        let payment = self.db.insert_payment(payment).await.map_err(|e| {
            debug!("💰️ Payment for {order_id} rejected: {e}");
            e
        })?;
        info!("💰️ {} of {} by {} created for {order_id}", payment.id, payment.amount, payment.payment_method);
        Ok(payment)
    }

    /// Applies a status reported by the payment processor.
    ///
    /// Completing a payment confirms a pending order. Failing it leaves the order alone so the customer can retry.
    /// See [`PaymentManagement::update_payment_status`] for the full rules.
    pub async fn update_payment_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        transaction_id: Option<String>,
    ) -> Result<PaymentUpdate, MarketError> {
        let update = self.db.update_payment_status(id, status, transaction_id).await?;
        if !update.is_changed() {
            debug!("💰️ {id} is already {status}");
            return Ok(update);
        }
        info!("💰️ {id} moved from {} to {status}", update.old_status);
        if let Some(changed) = &update.order {
            publish_status_change(&self.producers, changed, TransitionTrigger::PaymentSettled).await;
            if status == PaymentStatus::Completed {
                self.call_payment_completed_hook(&update.payment, &changed.order).await;
            }
        }
        Ok(update)
    }

    /// Refunds some or all of a completed payment.
    ///
    /// A refund for the full payment amount also cancels the order and releases its inventory, unless the order has
    /// already been completed. A partial refund only affects the payment.
    pub async fn refund_payment(&self, refund: Refund) -> Result<RefundResult, MarketError> {
        if !refund.amount.is_positive() {
            return Err(MarketError::InvalidRefundAmount(refund.amount));
        }
        let id = refund.payment_id;
        let result = self.db.refund_payment(refund).await?;
        info!(
            "💰️ {id} refunded {}. Order {} is {}",
            result.payment.refund_amount.unwrap_or_default(),
            result.order.order.id,
            result.order.order.status
        );
        publish_status_change(&self.producers, &result.order, TransitionTrigger::FullRefund).await;
        for emitter in &self.producers.payment_refunded_producer {
            debug!("💰️ Notifying payment refunded hook subscribers");
            let event = PaymentRefundedEvent::new(result.payment.clone(), result.order.order.clone(), result.full_refund);
            emitter.publish_event(event).await;
        }
        Ok(result)
    }

    pub async fn fetch_payment(&self, id: PaymentId) -> Result<Option<PaymentDetails>, MarketError> {
        self.db.fetch_payment(id).await
    }

    /// A page of the customer's payments across all their orders, newest first.
    pub async fn payments_for_customer(
        &self,
        customer_id: i64,
        pagination: Pagination,
    ) -> Result<Vec<PaymentDetails>, MarketError> {
        let filter = PaymentQueryFilter::default().with_customer_id(customer_id).with_pagination(pagination);
        self.db.fetch_payments(filter).await
    }

    /// Every payment made against the order, newest first.
    pub async fn payments_for_order(&self, order_id: OrderId) -> Result<Vec<PaymentDetails>, MarketError> {
        let pagination = Pagination::new(Some(1), Some(MAX_PAGE_SIZE));
        let filter = PaymentQueryFilter::default().with_order_id(order_id).with_pagination(pagination);
        self.db.fetch_payments(filter).await
    }

    pub async fn payment_stats(&self, customer_id: i64) -> Result<PaymentStats, MarketError> {
        self.db.fetch_payment_stats(customer_id).await
    }

    async fn call_payment_completed_hook(&self, payment: &Payment, order: &Order) {
        for emitter in &self.producers.payment_completed_producer {
            debug!("💰️ Notifying payment completed hook subscribers");
            emitter.publish_event(PaymentCompletedEvent::new(payment.clone(), order.clone())).await;
        }
    }
}
