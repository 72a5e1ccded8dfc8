use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{OrderId, OrderStatusType, StatusChange, TransitionTrigger},
};

/// Appends an entry to the order's status history. Entries are never modified afterwards.
pub async fn append(
    order_id: OrderId,
    old_status: Option<OrderStatusType>,
    new_status: OrderStatusType,
    triggered_by: TransitionTrigger,
    note: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        r#"
            INSERT INTO order_status_history (order_id, old_status, new_status, triggered_by, note, created_at)
            VALUES ($1, $2, $3, $4, $5, $6);
        "#,
    )
    .bind(order_id)
    .bind(old_status)
    .bind(new_status)
    .bind(triggered_by)
    .bind(note)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    Ok(())
}

/// The order's history, oldest first.
pub async fn fetch_history(
    order_id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<StatusChange>, SqliteDatabaseError> {
    let history = sqlx::query_as("SELECT * FROM order_status_history WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(history)
}
