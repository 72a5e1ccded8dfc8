use chrono::Utc;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{NewProduct, Product, ProductId, ProductUpdate},
};

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, SqliteDatabaseError> {
    let now = Utc::now();
    let product = sqlx::query_as(
        r#"
            INSERT INTO products (producer_id, name, unit, price, stock_quantity, is_available, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *;
        "#,
    )
    .bind(product.producer_id)
    .bind(product.name)
    .bind(product.unit)
    .bind(product.price)
    .bind(product.stock_quantity)
    .bind(product.is_available)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

pub async fn fetch_product(id: ProductId, conn: &mut SqliteConnection) -> Result<Option<Product>, SqliteDatabaseError> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(product)
}

pub async fn fetch_products(ids: &[ProductId], conn: &mut SqliteConnection) -> Result<Vec<Product>, SqliteDatabaseError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("SELECT * FROM products WHERE id IN (");
    let mut list = builder.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    list.push_unseparated(") ORDER BY id ASC");
    let products = builder.build_query_as::<Product>().fetch_all(conn).await?;
    Ok(products)
}

pub async fn fetch_products_for_producer(
    producer_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Product>, SqliteDatabaseError> {
    let products = sqlx::query_as("SELECT * FROM products WHERE producer_id = $1 ORDER BY id ASC")
        .bind(producer_id)
        .fetch_all(conn)
        .await?;
    Ok(products)
}

/// Applies the price and availability changes in one statement. Returns `None` if the product does not exist.
pub async fn update_product(
    id: ProductId,
    update: ProductUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, SqliteDatabaseError> {
    let product = sqlx::query_as(
        r#"
            UPDATE products SET
                price = COALESCE($1, price),
                is_available = COALESCE($2, is_available),
                updated_at = $3
            WHERE id = $4
            RETURNING *;
        "#,
    )
    .bind(update.price)
    .bind(update.is_available)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(product)
}
