use std::fmt::Display;

use harvest_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db_types::{Order, OrderId, OrderStatusType, TransitionTrigger};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// One-based page selection for listing queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, limit: DEFAULT_PAGE_SIZE }
    }
}

impl Pagination {
    /// Page numbers below 1 are treated as 1, and the page size is clamped to `1..=MAX_PAGE_SIZE`.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub customer_id: Option<i64>,
    pub producer_id: Option<i64>,
    #[serde(default)]
    pub statuses: Vec<OrderStatusType>,
    #[serde(default)]
    pub pagination: Pagination,
}

impl OrderQueryFilter {
    pub fn with_customer_id(mut self, customer_id: i64) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_producer_id(mut self, producer_id: i64) -> Self {
        self.producer_id = Some(producer_id);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.customer_id.is_none() && self.producer_id.is_none() && self.statuses.is_empty()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "No filters. ")?;
        }
        if let Some(id) = &self.customer_id {
            write!(f, "customer_id: {id}. ")?;
        }
        if let Some(id) = &self.producer_id {
            write!(f, "producer_id: {id}. ")?;
        }
        if !self.statuses.is_empty() {
            let statuses = self.statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "statuses: [{statuses}]. ")?;
        }
        write!(f, "page {} ({} per page)", self.pagination.page, self.pagination.limit)
    }
}

/// Restricts a status change to orders belonging to a particular party. A mismatch is reported as `OrderNotFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderOwner {
    Customer(i64),
    Producer(i64),
}

impl OrderOwner {
    pub fn owns(&self, order: &Order) -> bool {
        match self {
            OrderOwner::Customer(id) => order.customer_id == *id,
            OrderOwner::Producer(id) => order.producer_id == *id,
        }
    }
}

/// A request to move an order to a new status.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub order_id: OrderId,
    pub new_status: OrderStatusType,
    pub trigger: TransitionTrigger,
    pub owner: Option<OrderOwner>,
    pub note: Option<String>,
}

impl StatusUpdate {
    pub fn new(order_id: OrderId, new_status: OrderStatusType, trigger: TransitionTrigger) -> Self {
        Self { order_id, new_status, trigger, owner: None, note: None }
    }

    pub fn owned_by(mut self, owner: OrderOwner) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_note<S: Into<String>>(mut self, note: S) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// The result of a status change request. If the request did not change anything, `old_status` equals
/// `order.status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderChanged {
    pub old_status: OrderStatusType,
    pub order: Order,
}

impl OrderChanged {
    pub fn new(old_status: OrderStatusType, order: Order) -> Self {
        Self { old_status, order }
    }

    pub fn is_changed(&self) -> bool {
        self.old_status != self.order.status
    }
}

/// Order counts and value for one customer or producer.
///
/// `total_amount` and `average_order_value` leave out cancelled orders. For a customer they are what was spent, for a
/// producer what was earned.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderStats {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub confirmed_orders: i64,
    pub preparing_orders: i64,
    pub ready_orders: i64,
    pub completed_orders: i64,
    pub cancelled_orders: i64,
    pub total_amount: Money,
    pub average_order_value: Money,
}
