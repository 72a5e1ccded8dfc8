use chrono::Utc;
use harvest_common::Money;
use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db::sqlite::{status_history, SqliteDatabaseError},
    db_types::{NewOrder, Order, OrderId, OrderItem, OrderStatusType, ProductId},
    market_api::order_objects::{OrderOwner, OrderQueryFilter, OrderStats},
};

/// Takes the database write lock on behalf of the current transaction by touching the order row.
///
/// Call this before reading an order that the transaction is going to modify. Returns `false` if the order does not
/// exist.
pub async fn lock_order(id: OrderId, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query("UPDATE orders SET updated_at = updated_at WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected() == 1)
}

/// Inserts the order header with status `pending`. This is not atomic. Embed the call inside a transaction and pass
/// `&mut tx` as the connection argument.
pub async fn insert_order(
    order: &NewOrder,
    total_amount: Money,
    conn: &mut SqliteConnection,
) -> Result<OrderId, SqliteDatabaseError> {
    let now = Utc::now();
    let id = sqlx::query_scalar(
        r#"
            INSERT INTO orders (
                customer_id,
                producer_id,
                total_amount,
                delivery_type,
                delivery_address,
                notes,
                contact_email,
                status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING id;
        "#,
    )
    .bind(order.customer_id)
    .bind(order.producer_id)
    .bind(total_amount)
    .bind(order.delivery_type)
    .bind(order.address())
    .bind(order.notes.as_deref())
    .bind(order.contact_email.as_deref())
    .bind(OrderStatusType::Pending)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

pub async fn insert_item(
    order_id: OrderId,
    product_id: ProductId,
    quantity: i64,
    unit_price: Money,
    line_total: Money,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        r#"
            INSERT INTO order_items (order_id, product_id, quantity, unit_price, line_total)
            VALUES ($1, $2, $3, $4, $5);
        "#,
    )
    .bind(order_id)
    .bind(product_id)
    .bind(quantity)
    .bind(unit_price)
    .bind(line_total)
    .execute(conn)
    .await?;
    Ok(())
}

/// Fetches the order header only. `items` and `history` are left empty.
pub async fn fetch_order_record(id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, SqliteDatabaseError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_items(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, SqliteDatabaseError> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Fetches the order along with its items and status history.
pub async fn fetch_order(id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, SqliteDatabaseError> {
    let Some(mut order) = fetch_order_record(id, &mut *conn).await? else {
        return Ok(None);
    };
    order.items = fetch_items(id, &mut *conn).await?;
    order.history = status_history::fetch_history(id, conn).await?;
    Ok(Some(order))
}

pub async fn set_status(
    id: OrderId,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    sqlx::query("UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3")
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in descending order (newest first). Items and history are not loaded.
pub async fn fetch_orders(
    query: OrderQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, SqliteDatabaseError> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(id) = query.customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(id);
    }
    if let Some(id) = query.producer_id {
        where_clause.push("producer_id = ");
        where_clause.push_bind_unseparated(id);
    }
    if !query.statuses.is_empty() {
        where_clause.push("status IN (");
        let mut statuses = query.statuses.iter().peekable();
        while let Some(status) = statuses.next() {
            where_clause.push_bind_unseparated(*status);
            if statuses.peek().is_some() {
                where_clause.push_unseparated(", ");
            }
        }
        where_clause.push_unseparated(")");
    }
    builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
    builder.push_bind(i64::from(query.pagination.limit));
    builder.push(" OFFSET ");
    builder.push_bind(query.pagination.offset());

    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ Result of fetch_orders: {:?}", orders.len());
    Ok(orders)
}

/// Status counts and order value for one customer or producer. Cancelled orders are counted but left out of the totals.
pub async fn fetch_order_stats(
    owner: OrderOwner,
    conn: &mut SqliteConnection,
) -> Result<OrderStats, SqliteDatabaseError> {
    let (column, id) = match owner {
        OrderOwner::Customer(id) => ("customer_id", id),
        OrderOwner::Producer(id) => ("producer_id", id),
    };
    let mut builder = QueryBuilder::new(
        r#"
        SELECT
            COUNT(*) AS total_orders,
            COUNT(CASE WHEN status = 'pending' THEN 1 END) AS pending_orders,
            COUNT(CASE WHEN status = 'confirmed' THEN 1 END) AS confirmed_orders,
            COUNT(CASE WHEN status = 'preparing' THEN 1 END) AS preparing_orders,
            COUNT(CASE WHEN status = 'ready' THEN 1 END) AS ready_orders,
            COUNT(CASE WHEN status = 'completed' THEN 1 END) AS completed_orders,
            COUNT(CASE WHEN status = 'cancelled' THEN 1 END) AS cancelled_orders,
            COALESCE(SUM(CASE WHEN status <> 'cancelled' THEN total_amount END), 0) AS total_amount,
            CAST(COALESCE(ROUND(AVG(CASE WHEN status <> 'cancelled' THEN total_amount END)), 0) AS INTEGER)
                AS average_order_value
        FROM orders WHERE "#,
    );
    builder.push(column);
    builder.push(" = ");
    builder.push_bind(id);
    trace!("🗃️ Executing query: {}", builder.sql());
    let stats = builder.build_query_as::<OrderStats>().fetch_one(conn).await?;
    trace!("🗃️ Order stats for {owner:?}: {stats:?}");
    Ok(stats)
}
