//! Order and payment status rules.
//!
//! Every status change in the engine is checked against the tables in this module before it is written, whether it
//! comes from a producer, a customer cancellation, or as a side effect of a payment settling or being refunded.
//!
//! Order statuses advance along a single fulfilment chain:
//!
//! ```text
//!  pending ──> confirmed ──> preparing ──> ready ──> completed
//!     │
//!     └──────> cancelled
//! ```
//!
//! | Trigger           | From                                 | To          | Result                         |
//! |-------------------|--------------------------------------|-------------|--------------------------------|
//! | Producer update   | any non-terminal                     | later stage | applied (skipping is allowed)  |
//! | Producer update   | pending                              | cancelled   | applied, inventory released    |
//! | Producer update   | any non-terminal                     | same/earlier| `Invalid`                      |
//! | Producer update   | completed, cancelled                 | anything    | `Terminal`                     |
//! | Customer cancel   | pending                              | cancelled   | applied, inventory released    |
//! | Customer cancel   | anything else                        | cancelled   | `NotCancellable`               |
//! | Payment settled   | pending                              | confirmed   | applied                        |
//! | Payment settled   | confirmed, preparing, ready, complete| confirmed   | no change                      |
//! | Payment settled   | cancelled                            | confirmed   | `Terminal`                     |
//! | Full refund       | any non-terminal                     | cancelled   | applied, inventory released    |
//! | Full refund       | completed, cancelled                 | cancelled   | no change                      |
//!
//! `completed` and `cancelled` are terminal. Nothing leaves them.

use crate::db_types::{OrderStatusType, PaymentStatus, TransitionTrigger};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Write the new status and append a history entry.
    Apply,
    /// The order is already where this trigger would put it, or further along. Nothing is written.
    NoChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("The order is {from} and can no longer change status (requested {to})")]
    Terminal { from: OrderStatusType, to: OrderStatusType },
    #[error("Cannot move an order from {from} to {to}")]
    Invalid { from: OrderStatusType, to: OrderStatusType },
    #[error("Only pending orders can be cancelled. This order is {0}")]
    NotCancellable(OrderStatusType),
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Completed | OrderStatusType::Cancelled)
    }

    /// Position along the fulfilment chain. `None` for `Cancelled`, which is off the chain.
    fn stage(&self) -> Option<u8> {
        match self {
            OrderStatusType::Pending => Some(0),
            OrderStatusType::Confirmed => Some(1),
            OrderStatusType::Preparing => Some(2),
            OrderStatusType::Ready => Some(3),
            OrderStatusType::Completed => Some(4),
            OrderStatusType::Cancelled => None,
        }
    }

    /// Entering this status returns the order's reserved stock to inventory.
    pub fn releases_inventory(&self) -> bool {
        matches!(self, OrderStatusType::Cancelled)
    }
}

/// Decides whether an order in status `from` may move to `to` when the change is caused by `trigger`.
pub fn check_transition(
    from: OrderStatusType,
    to: OrderStatusType,
    trigger: TransitionTrigger,
) -> Result<TransitionOutcome, TransitionError> {
    use OrderStatusType::*;
    use TransitionOutcome::*;
    match trigger {
        TransitionTrigger::Checkout => Err(TransitionError::Invalid { from, to }),
        TransitionTrigger::ProducerUpdate => {
            if from.is_terminal() {
                return Err(TransitionError::Terminal { from, to });
            }
            match (from, to) {
                (Pending, Cancelled) => Ok(Apply),
                (_, Cancelled) => Err(TransitionError::Invalid { from, to }),
                _ => match (from.stage(), to.stage()) {
                    (Some(f), Some(t)) if t > f => Ok(Apply),
                    _ => Err(TransitionError::Invalid { from, to }),
                },
            }
        },
        TransitionTrigger::CustomerCancel => match (from, to) {
            (Pending, Cancelled) => Ok(Apply),
            (_, Cancelled) => Err(TransitionError::NotCancellable(from)),
            _ => Err(TransitionError::Invalid { from, to }),
        },
        TransitionTrigger::PaymentSettled => match (from, to) {
            (Pending, Confirmed) => Ok(Apply),
            (Cancelled, _) => Err(TransitionError::Terminal { from, to }),
            (Confirmed | Preparing | Ready | Completed, Confirmed) => Ok(NoChange),
            _ => Err(TransitionError::Invalid { from, to }),
        },
        TransitionTrigger::FullRefund => match (from, to) {
            (Completed | Cancelled, Cancelled) => Ok(NoChange),
            (_, Cancelled) => Ok(Apply),
            _ => Err(TransitionError::Invalid { from, to }),
        },
    }
}

/// Payment status changes that may be requested directly. `refunded` is only reachable through a refund.
///
/// | From      | To        | Result    |
/// |-----------|-----------|-----------|
/// | pending   | completed | applied   |
/// | pending   | failed    | applied   |
/// | x         | x         | no change |
/// | otherwise |           | rejected  |
pub fn check_payment_transition(from: PaymentStatus, to: PaymentStatus) -> Option<TransitionOutcome> {
    use PaymentStatus::*;
    match (from, to) {
        (Pending, Completed) | (Pending, Failed) => Some(TransitionOutcome::Apply),
        (f, t) if f == t => Some(TransitionOutcome::NoChange),
        _ => None,
    }
}
