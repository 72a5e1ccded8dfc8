use std::fmt::Debug;

use harvest_common::Money;
use log::*;
use sqlx::{SqliteConnection, SqlitePool};

use super::{db_url, errors::is_unique_violation, inventory, new_pool, orders, payments, products, status_history};
use crate::{
    db::{
        sqlite::SqliteDatabaseError,
        traits::{CatalogManagement, InventoryLedger, OrderManagement, PaymentManagement},
    },
    db_types::{
        NewOrder,
        NewPayment,
        NewProduct,
        Order,
        OrderId,
        OrderStatusType,
        Payment,
        PaymentId,
        PaymentStatus,
        Product,
        ProductId,
        ProductUpdate,
        TransitionTrigger,
        PAYMENT_TOLERANCE,
    },
    market_api::{
        errors::MarketError,
        order_objects::{OrderChanged, OrderOwner, OrderQueryFilter, OrderStats, StatusUpdate},
        payment_objects::{PaymentDetails, PaymentQueryFilter, PaymentStats, PaymentUpdate, Refund, RefundResult},
    },
    order_status::{check_payment_transition, check_transition, TransitionOutcome},
};

/// SQLite backend for the marketplace.
///
/// Every mutating operation runs in a single transaction whose first statement is a write. SQLite then holds the
/// database write lock for the whole transaction, so the reads that decide what to write cannot be invalidated by a
/// concurrent writer, and concurrent operations on the same order or product are serialised.
#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Connects to the database given by `HH_DATABASE_URL`, or the default location.
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let pool = new_pool(url, max_connections).await?;
        trace!("🗃️ Created new connection pool for {url}");
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date.
    pub async fn run_migrations(&self) -> Result<(), SqliteDatabaseError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete for {}", self.url);
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), SqliteDatabaseError> {
        self.pool.close().await;
        Ok(())
    }
}

/// Runs a status change through the state machine and applies it on `conn`. Must be called inside a transaction.
async fn apply_transition(update: StatusUpdate, conn: &mut SqliteConnection) -> Result<OrderChanged, MarketError> {
    let id = update.order_id;
    if !orders::lock_order(id, &mut *conn).await? {
        return Err(MarketError::OrderNotFound(id));
    }
    let order = orders::fetch_order_record(id, &mut *conn).await?.ok_or(MarketError::OrderNotFound(id))?;
    if let Some(owner) = update.owner {
        if !owner.owns(&order) {
            debug!("🗃️ {id} does not belong to {owner:?}");
            return Err(MarketError::OrderNotFound(id));
        }
    }
    let old_status = order.status;
    let new_status = update.new_status;
    let outcome =
        check_transition(old_status, new_status, update.trigger).map_err(|e| MarketError::from_transition(id, e))?;
    match outcome {
        TransitionOutcome::NoChange => {
            debug!("🗃️ {id} is already {old_status}. The {} leaves it unchanged", update.trigger);
        },
        TransitionOutcome::Apply => {
            orders::set_status(id, new_status, &mut *conn).await?;
            status_history::append(id, Some(old_status), new_status, update.trigger, update.note, &mut *conn).await?;
            if new_status.releases_inventory() {
                for item in orders::fetch_items(id, &mut *conn).await? {
                    inventory::release(item.product_id, item.quantity, &mut *conn).await?;
                }
                debug!("🗃️ Inventory for {id} has been returned to stock");
            }
            debug!("🗃️ {id} moved from {old_status} to {new_status} ({})", update.trigger);
        },
    }
    let order = orders::fetch_order(id, conn).await?.ok_or(MarketError::OrderNotFound(id))?;
    Ok(OrderChanged::new(old_status, order))
}

impl CatalogManagement for SqliteDatabase {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, MarketError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::insert_product(product, &mut conn).await?;
        debug!("🗃️ {} ({}) listed by producer {}", product.id, product.name, product.producer_id);
        Ok(product)
    }

    async fn fetch_product(&self, id: ProductId) -> Result<Option<Product>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_product(id, &mut conn).await?)
    }

    async fn fetch_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_products(ids, &mut conn).await?)
    }

    async fn fetch_products_for_producer(&self, producer_id: i64) -> Result<Vec<Product>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_products_for_producer(producer_id, &mut conn).await?)
    }

    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<Product, MarketError> {
        let mut conn = self.pool.acquire().await?;
        products::update_product(id, update, &mut conn).await?.ok_or(MarketError::ProductNotFound(id))
    }
}

impl InventoryLedger for SqliteDatabase {
    async fn reserve(&self, product_id: ProductId, quantity: i64) -> Result<(), MarketError> {
        if quantity <= 0 {
            return Err(MarketError::InvalidQuantity(format!("Cannot reserve {quantity} units of {product_id}")));
        }
        let mut conn = self.pool.acquire().await?;
        if inventory::reserve(product_id, quantity, &mut conn).await? {
            return Ok(());
        }
        let available =
            inventory::stock_level(product_id, &mut conn).await?.ok_or(MarketError::ProductNotFound(product_id))?;
        Err(MarketError::OutOfStock { product_id, requested: quantity, available })
    }

    async fn release(&self, product_id: ProductId, quantity: i64) -> Result<(), MarketError> {
        if quantity <= 0 {
            return Err(MarketError::InvalidQuantity(format!("Cannot release {quantity} units of {product_id}")));
        }
        let mut conn = self.pool.acquire().await?;
        inventory::release(product_id, quantity, &mut conn).await?;
        Ok(())
    }

    async fn stock_level(&self, product_id: ProductId) -> Result<Option<i64>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        Ok(inventory::stock_level(product_id, &mut conn).await?)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, MarketError> {
        let mut tx = self.pool.begin().await?;
        let mut lines = Vec::with_capacity(order.items.len());
        let mut total = Money::default();
        for line in &order.items {
            let product_id = line.product_id;
            if line.quantity <= 0 {
                return Err(MarketError::InvalidQuantity(format!("{product_id} has quantity {}", line.quantity)));
            }
            // The reservation is the first write, so the product rows read below cannot change until commit
            if !inventory::reserve(product_id, line.quantity, &mut tx).await? {
                let product = products::fetch_product(product_id, &mut tx).await?;
                return Err(match product {
                    Some(p) if p.is_orderable_from(order.producer_id) => {
                        MarketError::OutOfStock { product_id, requested: line.quantity, available: p.stock_quantity }
                    },
                    _ => MarketError::ProductUnavailable(product_id),
                });
            }
            let product = products::fetch_product(product_id, &mut tx)
                .await?
                .filter(|p| p.is_orderable_from(order.producer_id))
                .ok_or(MarketError::ProductUnavailable(product_id))?;
            let line_total = product
                .price
                .checked_mul(line.quantity)
                .ok_or_else(|| MarketError::InvalidQuantity(format!("{} of {product_id} is too many", line.quantity)))?;
            total = total
                .checked_add(line_total)
                .ok_or_else(|| MarketError::InvalidQuantity("The order total is too large".to_string()))?;
            lines.push((product_id, line.quantity, product.price, line_total));
        }
        let id = orders::insert_order(&order, total, &mut tx).await?;
        for (product_id, quantity, unit_price, line_total) in lines {
            orders::insert_item(id, product_id, quantity, unit_price, line_total, &mut tx).await?;
        }
        let note = Some("Order placed".to_string());
        status_history::append(id, None, OrderStatusType::Pending, TransitionTrigger::Checkout, note, &mut tx).await?;
        let placed = orders::fetch_order(id, &mut tx)
            .await?
            .ok_or_else(|| MarketError::DatabaseError(format!("{id} vanished during checkout")))?;
        tx.commit().await?;
        debug!("🗃️ {id} placed by customer {} for {total}", placed.customer_id);
        Ok(placed)
    }

    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, MarketError> {
        // A read transaction, so that the order, its items and its history come from the same snapshot
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order(id, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn fetch_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        trace!("🗃️ Fetching orders. {filter}");
        Ok(orders::fetch_orders(filter, &mut conn).await?)
    }

    async fn fetch_order_stats(&self, owner: OrderOwner) -> Result<OrderStats, MarketError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_stats(owner, &mut conn).await?)
    }

    async fn update_order_status(&self, update: StatusUpdate) -> Result<OrderChanged, MarketError> {
        let mut tx = self.pool.begin().await?;
        let changed = apply_transition(update, &mut tx).await?;
        tx.commit().await?;
        Ok(changed)
    }
}

impl PaymentManagement for SqliteDatabase {
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, MarketError> {
        if !payment.amount.is_positive() {
            return Err(MarketError::InvalidPaymentAmount(payment.amount));
        }
        let order_id = payment.order_id;
        let mut tx = self.pool.begin().await?;
        if !orders::lock_order(order_id, &mut tx).await? {
            return Err(MarketError::OrderNotFound(order_id));
        }
        let order = orders::fetch_order_record(order_id, &mut tx).await?.ok_or(MarketError::OrderNotFound(order_id))?;
        if order.status == OrderStatusType::Cancelled {
            return Err(MarketError::OrderCancelled(order_id));
        }
        if payments::completed_payment_exists(order_id, &mut tx).await? {
            return Err(MarketError::PaymentAlreadyCompleted(order_id));
        }
        if !payment.amount.matches_within(order.total_amount, PAYMENT_TOLERANCE) {
            return Err(MarketError::AmountMismatch { expected: order.total_amount, received: payment.amount });
        }
        let payment = payments::insert_payment(payment, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ {} of {} recorded against {order_id}", payment.id, payment.amount);
        Ok(payment)
    }

    async fn fetch_payment(&self, id: PaymentId) -> Result<Option<PaymentDetails>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_payment_details(id, &mut conn).await?)
    }

    async fn fetch_payments(&self, filter: PaymentQueryFilter) -> Result<Vec<PaymentDetails>, MarketError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_payments(filter, &mut conn).await?)
    }

    async fn fetch_payment_stats(&self, customer_id: i64) -> Result<PaymentStats, MarketError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_payment_stats(customer_id, &mut conn).await?)
    }

    async fn update_payment_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        transaction_id: Option<String>,
    ) -> Result<PaymentUpdate, MarketError> {
        let mut tx = self.pool.begin().await?;
        if !payments::lock_payment(id, &mut tx).await? {
            return Err(MarketError::PaymentNotFound(id));
        }
        let payment = payments::fetch_payment(id, &mut tx).await?.ok_or(MarketError::PaymentNotFound(id))?;
        let old_status = payment.status;
        let order_id = payment.order_id;
        let outcome = check_payment_transition(old_status, status)
            .ok_or(MarketError::InvalidPaymentTransition { from: old_status, to: status })?;
        let mut order = None;
        if outcome == TransitionOutcome::Apply {
            if status == PaymentStatus::Completed {
                let current =
                    orders::fetch_order_record(order_id, &mut tx).await?.ok_or(MarketError::OrderNotFound(order_id))?;
                if current.status == OrderStatusType::Cancelled {
                    return Err(MarketError::OrderCancelled(order_id));
                }
            }
            payments::set_status(id, status, transaction_id, &mut tx).await.map_err(|e| {
                if is_unique_violation(&e) {
                    MarketError::PaymentAlreadyCompleted(order_id)
                } else {
                    MarketError::from(e)
                }
            })?;
            debug!("🗃️ {id} moved from {old_status} to {status}");
            if status == PaymentStatus::Completed {
                let update = StatusUpdate::new(order_id, OrderStatusType::Confirmed, TransitionTrigger::PaymentSettled)
                    .with_note(format!("Payment {} completed", id.value()));
                order = Some(apply_transition(update, &mut tx).await?);
            }
        } else {
            debug!("🗃️ {id} is already {status}. Nothing to do");
        }
        let payment = payments::fetch_payment(id, &mut tx).await?.ok_or(MarketError::PaymentNotFound(id))?;
        tx.commit().await?;
        Ok(PaymentUpdate { old_status, payment, order })
    }

    async fn refund_payment(&self, refund: Refund) -> Result<RefundResult, MarketError> {
        let id = refund.payment_id;
        if !refund.amount.is_positive() {
            return Err(MarketError::InvalidRefundAmount(refund.amount));
        }
        let mut tx = self.pool.begin().await?;
        if !payments::lock_payment(id, &mut tx).await? {
            return Err(MarketError::PaymentNotFound(id));
        }
        let payment = payments::fetch_payment(id, &mut tx).await?.ok_or(MarketError::PaymentNotFound(id))?;
        if payment.status != PaymentStatus::Completed {
            return Err(MarketError::PaymentNotCompleted(id, payment.status));
        }
        if refund.amount > payment.amount {
            return Err(MarketError::RefundExceedsPayment { refund: refund.amount, paid: payment.amount });
        }
        let full_refund = refund.amount.matches_within(payment.amount, PAYMENT_TOLERANCE);
        let note = match &refund.reason {
            Some(reason) => format!("Payment {} refunded: {reason}", id.value()),
            None => format!("Payment {} refunded", id.value()),
        };
        payments::record_refund(id, refund.amount, refund.reason, &mut tx).await?;
        let order = if full_refund {
            let update = StatusUpdate::new(payment.order_id, OrderStatusType::Cancelled, TransitionTrigger::FullRefund)
                .with_note(note);
            apply_transition(update, &mut tx).await?
        } else {
            let order = orders::fetch_order(payment.order_id, &mut tx)
                .await?
                .ok_or(MarketError::OrderNotFound(payment.order_id))?;
            OrderChanged::new(order.status, order)
        };
        let payment = payments::fetch_payment(id, &mut tx).await?.ok_or(MarketError::PaymentNotFound(id))?;
        tx.commit().await?;
        debug!("🗃️ {id} refunded {} (full refund: {full_refund})", refund.amount);
        Ok(RefundResult { payment, order, full_refund })
    }
}
