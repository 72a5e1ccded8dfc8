use std::env;

use harvest_common::Money;
use harvest_engine::{db_types::NewProduct, CatalogApi, SqliteDatabase};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

/// A fresh database URL in the system temp directory.
pub fn random_db_path() -> String {
    let dir = env::temp_dir();
    format!("sqlite://{}/harvest_test_{}.db", dir.display(), rand::random::<u64>())
}

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    create_database(url).await;
    run_migrations(url).await;
}

pub async fn create_database(url: &str) {
    if Sqlite::database_exists(url).await.unwrap_or(false) {
        Sqlite::drop_database(url).await.expect("Error dropping database");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    debug!("🚀️ Created test database {url}");
}

pub async fn run_migrations(url: &str) {
    let mut db = SqliteDatabase::new_with_url(url, 1).await.expect("Error creating connection to database");
    db.run_migrations().await.expect("Error running DB migrations");
    db.close().await.expect("Error closing database");
}

/// Creates a migrated database at a random location and connects to it.
pub async fn new_test_db(max_connections: u32) -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, max_connections).await.expect("Error creating database")
}

pub async fn tear_down(mut db: SqliteDatabase) {
    let url = db.url().to_string();
    if let Err(e) = db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("🚀️ Could not remove test database {url}: {e}");
    }
}

/// Lists a product for `producer_id` at `price` minor units.
pub async fn seed_product(db: &SqliteDatabase, producer_id: i64, name: &str, price: i64, stock: i64) -> i64 {
    let api = CatalogApi::new(db.clone());
    let product = NewProduct::new(producer_id, name, Money::from(price), stock);
    api.add_product(product).await.expect("Error adding product").id.value()
}
