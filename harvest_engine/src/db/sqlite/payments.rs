use chrono::Utc;
use harvest_common::Money;
use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{NewPayment, OrderId, Payment, PaymentId, PaymentStatus},
    market_api::payment_objects::{PaymentDetails, PaymentQueryFilter, PaymentStats},
};

const DETAILS_QUERY: &str = r#"
    SELECT
        payments.*,
        orders.total_amount AS order_total,
        orders.status AS order_status,
        orders.customer_id AS customer_id,
        orders.producer_id AS producer_id
    FROM payments JOIN orders ON orders.id = payments.order_id
"#;

/// Takes the database write lock on behalf of the current transaction by touching the payment row.
/// Returns `false` if the payment does not exist.
pub async fn lock_payment(id: PaymentId, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    let result =
        sqlx::query("UPDATE payments SET updated_at = updated_at WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected() == 1)
}

pub async fn insert_payment(payment: NewPayment, conn: &mut SqliteConnection) -> Result<Payment, SqliteDatabaseError> {
    let now = Utc::now();
    let payment = sqlx::query_as(
        r#"
            INSERT INTO payments (order_id, amount, payment_method, transaction_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *;
        "#,
    )
    .bind(payment.order_id)
    .bind(payment.amount)
    .bind(payment.payment_method)
    .bind(payment.transaction_id)
    .bind(PaymentStatus::Pending)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(payment)
}

pub async fn fetch_payment(id: PaymentId, conn: &mut SqliteConnection) -> Result<Option<Payment>, SqliteDatabaseError> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(payment)
}

pub async fn fetch_payment_details(
    id: PaymentId,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentDetails>, SqliteDatabaseError> {
    let mut builder = QueryBuilder::new(DETAILS_QUERY);
    builder.push(" WHERE payments.id = ");
    builder.push_bind(id);
    let details = builder.build_query_as::<PaymentDetails>().fetch_optional(conn).await?;
    Ok(details)
}

pub async fn completed_payment_exists(order_id: OrderId, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE order_id = $1 AND status = $2")
        .bind(order_id)
        .bind(PaymentStatus::Completed)
        .fetch_one(conn)
        .await?;
    Ok(count > 0)
}

/// Fetches payments matching the filter, newest first.
pub async fn fetch_payments(
    query: PaymentQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentDetails>, SqliteDatabaseError> {
    let mut builder = QueryBuilder::new(DETAILS_QUERY);
    if query.customer_id.is_some() || query.order_id.is_some() {
        builder.push(" WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(id) = query.customer_id {
        where_clause.push("orders.customer_id = ");
        where_clause.push_bind_unseparated(id);
    }
    if let Some(id) = query.order_id {
        where_clause.push("payments.order_id = ");
        where_clause.push_bind_unseparated(id);
    }
    builder.push(" ORDER BY payments.created_at DESC, payments.id DESC LIMIT ");
    builder.push_bind(i64::from(query.pagination.limit));
    builder.push(" OFFSET ");
    builder.push_bind(query.pagination.offset());
    trace!("🗃️ Executing query: {}", builder.sql());
    let payments = builder.build_query_as::<PaymentDetails>().fetch_all(conn).await?;
    Ok(payments)
}

/// Sets the payment status. A `transaction_id` of `None` keeps whatever reference is already stored.
pub async fn set_status(
    id: PaymentId,
    status: PaymentStatus,
    transaction_id: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        "UPDATE payments SET status = $1, transaction_id = COALESCE($2, transaction_id), updated_at = $3 WHERE id = $4",
    )
    .bind(status)
    .bind(transaction_id)
    .bind(Utc::now())
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn record_refund(
    id: PaymentId,
    amount: Money,
    reason: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        r#"
            UPDATE payments SET status = $1, refund_amount = $2, refund_reason = $3, updated_at = $4
            WHERE id = $5;
        "#,
    )
    .bind(PaymentStatus::Refunded)
    .bind(amount)
    .bind(reason)
    .bind(Utc::now())
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Payment counts and amounts over all of a customer's orders. Only completed payments count towards `total_paid`.
pub async fn fetch_payment_stats(
    customer_id: i64,
    conn: &mut SqliteConnection,
) -> Result<PaymentStats, SqliteDatabaseError> {
    let stats: PaymentStats = sqlx::query_as(
        r#"
        SELECT
            COUNT(*) AS total_payments,
            COUNT(CASE WHEN payments.status = 'pending' THEN 1 END) AS pending_payments,
            COUNT(CASE WHEN payments.status = 'completed' THEN 1 END) AS successful_payments,
            COUNT(CASE WHEN payments.status = 'failed' THEN 1 END) AS failed_payments,
            COUNT(CASE WHEN payments.status = 'refunded' THEN 1 END) AS refunded_payments,
            COALESCE(SUM(CASE WHEN payments.status = 'completed' THEN payments.amount END), 0) AS total_paid,
            CAST(COALESCE(ROUND(AVG(CASE WHEN payments.status = 'completed' THEN payments.amount END)), 0) AS INTEGER)
                AS average_payment,
            COALESCE(SUM(payments.refund_amount), 0) AS total_refunded
        FROM payments JOIN orders ON orders.id = payments.order_id
        WHERE orders.customer_id = $1
        "#,
    )
    .bind(customer_id)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Payment stats for customer {customer_id}: {stats:?}");
    Ok(stats)
}
