use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    OrderCreatedEvent,
    OrderStatusChangedEvent,
    PaymentCompletedEvent,
    PaymentRefundedEvent,
};

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// The publishing side of the event system. The APIs hold one of these and publish to every producer in the relevant
/// list once a change has been committed.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_created_producer: Vec<EventProducer<OrderCreatedEvent>>,
    pub order_status_changed_producer: Vec<EventProducer<OrderStatusChangedEvent>>,
    pub payment_completed_producer: Vec<EventProducer<PaymentCompletedEvent>>,
    pub payment_refunded_producer: Vec<EventProducer<PaymentRefundedEvent>>,
}

pub struct EventHandlers {
    pub on_order_created: Option<EventHandler<OrderCreatedEvent>>,
    pub on_order_status_changed: Option<EventHandler<OrderStatusChangedEvent>>,
    pub on_payment_completed: Option<EventHandler<PaymentCompletedEvent>>,
    pub on_payment_refunded: Option<EventHandler<PaymentRefundedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_created = hooks.on_order_created.map(|f| EventHandler::new("order created", buffer_size, f));
        let on_order_status_changed =
            hooks.on_order_status_changed.map(|f| EventHandler::new("order status changed", buffer_size, f));
        let on_payment_completed =
            hooks.on_payment_completed.map(|f| EventHandler::new("payment completed", buffer_size, f));
        let on_payment_refunded =
            hooks.on_payment_refunded.map(|f| EventHandler::new("payment refunded", buffer_size, f));
        Self { on_order_created, on_order_status_changed, on_payment_completed, on_payment_refunded }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_created {
            result.order_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_status_changed {
            result.order_status_changed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payment_completed {
            result.payment_completed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payment_refunded {
            result.payment_refunded_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns a task for each configured handler. Each task ends once all the producers feeding it are dropped.
    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_created {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_status_changed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_payment_completed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_payment_refunded {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_created: Option<Handler<OrderCreatedEvent>>,
    pub on_order_status_changed: Option<Handler<OrderStatusChangedEvent>>,
    pub on_payment_completed: Option<Handler<PaymentCompletedEvent>>,
    pub on_payment_refunded: Option<Handler<PaymentRefundedEvent>>,
}

impl EventHooks {
    pub fn on_order_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCreatedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_created = Some(Arc::new(f));
        self
    }

    pub fn on_order_status_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderStatusChangedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_status_changed = Some(Arc::new(f));
        self
    }

    pub fn on_payment_completed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentCompletedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_payment_completed = Some(Arc::new(f));
        self
    }

    pub fn on_payment_refunded<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentRefundedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_payment_refunded = Some(Arc::new(f));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.on_order_created.is_none()
            && self.on_order_status_changed.is_none()
            && self.on_payment_completed.is_none()
            && self.on_payment_refunded.is_none()
    }
}
