//! Stock bookkeeping. Nothing else in the backend writes `products.stock_quantity`.
//!
//! A reservation is a single conditional `UPDATE`, so the check and the decrement cannot be split by another writer.
use chrono::Utc;
use log::{trace, warn};
use sqlx::SqliteConnection;

use crate::{db::sqlite::SqliteDatabaseError, db_types::ProductId};

/// Takes `quantity` units out of stock. Returns `false`, changing nothing, if fewer than `quantity` units are in stock
/// or the product does not exist.
pub async fn reserve(
    product_id: ProductId,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query(
        "UPDATE products SET stock_quantity = stock_quantity - $1, updated_at = $2 WHERE id = $3 AND stock_quantity >= $1",
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(product_id)
    .execute(conn)
    .await?;
    let reserved = result.rows_affected() == 1;
    trace!("🗃️ Reserve {quantity} of {product_id}: {reserved}");
    Ok(reserved)
}

/// Returns `quantity` units to stock.
pub async fn release(
    product_id: ProductId,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    let result =
        sqlx::query("UPDATE products SET stock_quantity = stock_quantity + $1, updated_at = $2 WHERE id = $3")
            .bind(quantity)
            .bind(Utc::now())
            .bind(product_id)
            .execute(conn)
            .await?;
    if result.rows_affected() == 0 {
        warn!("🗃️ Tried to release {quantity} units of {product_id}, but the product does not exist");
    } else {
        trace!("🗃️ Released {quantity} of {product_id}");
    }
    Ok(())
}

pub async fn stock_level(product_id: ProductId, conn: &mut SqliteConnection) -> Result<Option<i64>, SqliteDatabaseError> {
    let level = sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(conn)
        .await?;
    Ok(level)
}
