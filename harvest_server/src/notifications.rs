//! Customer notifications.
//!
//! Order and payment events are turned into short plain-text emails addressed to the order's `contact_email`. When no
//! SMTP server is configured the messages are written to the log instead. Delivery runs on the event handler tasks, so
//! a slow or failing mail server never delays or fails the request that caused the event.
use std::sync::Arc;

use harvest_engine::{
    db_types::{Order, OrderStatusType, Payment},
    events::{EventHooks, OrderCreatedEvent, OrderStatusChangedEvent, PaymentCompletedEvent, PaymentRefundedEvent},
};
use lettre::{
    message::header::ContentType,
    transport::smtp::{authentication::Credentials, Error as SmtpError},
    AsyncSmtpTransport,
    AsyncTransport,
    Message,
    Tokio1Executor,
};
use log::*;
use thiserror::Error;

use crate::config::EmailConfig;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    /// A notification for the order's contact address, if it has one.
    fn for_order(order: &Order, subject: String, body: String) -> Option<Self> {
        let to = order.contact_email.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some(Self { to: to.to_string(), subject, body })
    }
}

#[derive(Clone)]
pub struct Notifier {
    mailer: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_address: String,
}

impl Notifier {
    pub fn new(config: Option<&EmailConfig>) -> Result<Self, EmailError> {
        let Some(config) = config else {
            return Ok(Self::log_only());
        };
        let credentials = Credentials::new(config.smtp_username.clone(), config.smtp_password.reveal().clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();
        info!("📧️ Notifications will be emailed via {}:{}", config.smtp_host, config.smtp_port);
        Ok(Self { mailer: Some(mailer), from_address: config.from_address.clone() })
    }

    pub fn log_only() -> Self {
        Self { mailer: None, from_address: String::default() }
    }

    pub async fn send(&self, note: &Notification) -> Result<(), EmailError> {
        let Some(mailer) = &self.mailer else {
            info!("📧️ [not emailed] To: {} | {} | {}", note.to, note.subject, note.body);
            return Ok(());
        };
        let email = Message::builder()
            .from(self.from_address.parse().map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?)
            .to(note.to.parse().map_err(|_| EmailError::InvalidAddress(note.to.clone()))?)
            .subject(note.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(note.body.clone())?;
        mailer.send(email).await?;
        debug!("📧️ Sent \"{}\" to {}", note.subject, note.to);
        Ok(())
    }

    /// Sends the notification, if there is one. Failures are logged and otherwise ignored.
    pub async fn deliver(&self, note: Option<Notification>) {
        let Some(note) = note else {
            trace!("📧️ No contact address. Nothing to send");
            return;
        };
        if let Err(e) = self.send(&note).await {
            warn!("📧️ Could not send \"{}\" to {}. {e}", note.subject, note.to);
        }
    }
}

pub fn order_created(order: &Order) -> Option<Notification> {
    let lines = order
        .items
        .iter()
        .map(|i| format!("  {} x product {} @ {} = {}", i.quantity, i.product_id.value(), i.unit_price, i.line_total))
        .collect::<Vec<_>>()
        .join("\n");
    let body = format!(
        "Thank you for your order!\n\nOrder #{} ({})\n{lines}\nTotal: {}\n\nWe will let you know when the producer \
         confirms it.",
        order.id.value(),
        order.delivery_type,
        order.total_amount
    );
    Notification::for_order(order, format!("Order #{} received", order.id.value()), body)
}

pub fn status_changed(old_status: OrderStatusType, order: &Order) -> Option<Notification> {
    let message = match order.status {
        OrderStatusType::Confirmed => "has been confirmed by the producer",
        OrderStatusType::Preparing => "is being prepared",
        OrderStatusType::Ready => "is ready",
        OrderStatusType::Completed => "is complete",
        OrderStatusType::Cancelled => "has been cancelled",
        OrderStatusType::Pending => "is pending",
    };
    let body = format!("Your order #{} {message}. (It was {old_status}.)", order.id.value());
    Notification::for_order(order, format!("Order #{} is {}", order.id.value(), order.status), body)
}

pub fn payment_completed(payment: &Payment, order: &Order) -> Option<Notification> {
    let body = format!(
        "We have received your {} payment of {} for order #{}.",
        payment.payment_method,
        payment.amount,
        order.id.value()
    );
    Notification::for_order(order, format!("Payment received for order #{}", order.id.value()), body)
}

pub fn payment_refunded(payment: &Payment, order: &Order, full_refund: bool) -> Option<Notification> {
    let amount = payment.refund_amount.unwrap_or(payment.amount);
    let mut body = format!("A refund of {amount} has been issued for order #{}.", order.id.value());
    if full_refund && order.status == OrderStatusType::Cancelled {
        body.push_str(" The order has been cancelled.");
    }
    if let Some(reason) = &payment.refund_reason {
        body.push_str(&format!("\nReason: {reason}"));
    }
    Notification::for_order(order, format!("Refund for order #{}", order.id.value()), body)
}

/// Event hooks that notify customers of order and payment changes through `notifier`.
pub fn notification_hooks(notifier: Notifier) -> EventHooks {
    let notifier = Arc::new(notifier);
    let mut hooks = EventHooks::default();
    let n = Arc::clone(&notifier);
    hooks.on_order_created(move |ev: OrderCreatedEvent| {
        let n = Arc::clone(&n);
        Box::pin(async move { n.deliver(order_created(&ev.order)).await })
    });
    let n = Arc::clone(&notifier);
    hooks.on_order_status_changed(move |ev: OrderStatusChangedEvent| {
        let n = Arc::clone(&n);
        Box::pin(async move { n.deliver(status_changed(ev.old_status, &ev.order)).await })
    });
    let n = Arc::clone(&notifier);
    hooks.on_payment_completed(move |ev: PaymentCompletedEvent| {
        let n = Arc::clone(&n);
        Box::pin(async move { n.deliver(payment_completed(&ev.payment, &ev.order)).await })
    });
    let n = notifier;
    hooks.on_payment_refunded(move |ev: PaymentRefundedEvent| {
        let n = Arc::clone(&n);
        Box::pin(async move { n.deliver(payment_refunded(&ev.payment, &ev.order, ev.full_refund)).await })
    });
    hooks
}
