use thiserror::Error;

use crate::market_api::errors::MarketError;

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Could not run database migrations: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Database query error: {0}")]
    QueryError(String),
}

impl From<SqliteDatabaseError> for MarketError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::QueryError(s) => MarketError::QueryError(s),
            e => MarketError::DatabaseError(e.to_string()),
        }
    }
}

/// True if the error was raised by a UNIQUE index, e.g. a second completed payment for the same order.
pub(crate) fn is_unique_violation(e: &SqliteDatabaseError) -> bool {
    match e {
        SqliteDatabaseError::DriverError(sqlx::Error::Database(db)) => db.is_unique_violation(),
        _ => false,
    }
}
