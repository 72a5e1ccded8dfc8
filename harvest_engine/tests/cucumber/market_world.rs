use std::collections::HashMap;

use cucumber::World;
use harvest_engine::{
    db_types::{NewOrder, OrderId, PaymentId, ProductId},
    events::EventProducers,
    CatalogApi,
    CheckoutApi,
    MarketError,
    OrderFlowApi,
    PaymentApi,
    SqliteDatabase,
};
use log::*;

use crate::support::prepare_env::{create_database, random_db_path, run_migrations};

#[derive(Default, Debug, World)]
pub struct MarketWorld {
    pub system: Option<MarketSystem>,
    pub products: HashMap<String, ProductId>,
    pub orders: HashMap<String, OrderId>,
    pub payments: HashMap<String, PaymentId>,
    /// The cart being built up by the current scenario
    pub cart: Option<NewOrder>,
    pub last_error: Option<MarketError>,
}

#[derive(Debug)]
pub struct MarketSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub catalog: CatalogApi<SqliteDatabase>,
    pub checkout: CheckoutApi<SqliteDatabase>,
    pub flow: OrderFlowApi<SqliteDatabase>,
    pub payments: PaymentApi<SqliteDatabase>,
}

impl MarketSystem {
    pub async fn new() -> Self {
        let url = random_db_path();
        create_database(&url).await;
        run_migrations(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("🚀️ Created database: {url}");
        let producers = EventProducers::default();
        Self {
            db_path: url,
            catalog: CatalogApi::new(db.clone()),
            checkout: CheckoutApi::new(db.clone(), producers.clone()),
            flow: OrderFlowApi::new(db.clone(), producers.clone()),
            payments: PaymentApi::new(db.clone(), producers),
            db,
        }
    }
}

impl MarketWorld {
    pub fn system(&self) -> &MarketSystem {
        self.system.as_ref().expect("Marketplace not initialised")
    }

    pub fn product(&self, name: &str) -> ProductId {
        *self.products.get(name).unwrap_or_else(|| panic!("No product called {name}"))
    }

    pub fn order(&self, name: &str) -> OrderId {
        *self.orders.get(name).unwrap_or_else(|| panic!("No order called {name}"))
    }

    pub fn payment(&self, name: &str) -> PaymentId {
        *self.payments.get(name).unwrap_or_else(|| panic!("No payment called {name}"))
    }

    pub fn cart_mut(&mut self) -> &mut NewOrder {
        self.cart.as_mut().expect("No order has been started")
    }

    /// Keeps the error, if any, so that a later step can check it.
    pub fn record<T>(&mut self, result: Result<T, MarketError>) -> Option<T> {
        match result {
            Ok(v) => {
                self.last_error = None;
                Some(v)
            },
            Err(e) => {
                debug!("🚀️ Request failed: {e}");
                self.last_error = Some(e);
                None
            },
        }
    }
}

/// The variant name of an error, as written in feature files.
pub fn error_name(e: &MarketError) -> &'static str {
    match e {
        MarketError::DatabaseError(_) => "DatabaseError",
        MarketError::InvalidProduct(_) => "InvalidProduct",
        MarketError::ProductNotFound(_) => "ProductNotFound",
        MarketError::ProductUnavailable(_) => "ProductUnavailable",
        MarketError::InvalidQuantity(_) => "InvalidQuantity",
        MarketError::MissingDeliveryAddress => "MissingDeliveryAddress",
        MarketError::OutOfStock { .. } => "OutOfStock",
        MarketError::OrderNotFound(_) => "OrderNotFound",
        MarketError::InvalidTransition { .. } => "InvalidTransition",
        MarketError::NotCancellable(..) => "NotCancellable",
        MarketError::OrderCancelled(_) => "OrderCancelled",
        MarketError::AmountMismatch { .. } => "AmountMismatch",
        MarketError::InvalidPaymentAmount(_) => "InvalidPaymentAmount",
        MarketError::PaymentNotFound(_) => "PaymentNotFound",
        MarketError::InvalidPaymentTransition { .. } => "InvalidPaymentTransition",
        MarketError::PaymentAlreadyCompleted(_) => "PaymentAlreadyCompleted",
        MarketError::PaymentNotCompleted(..) => "PaymentNotCompleted",
        MarketError::InvalidRefundAmount(_) => "InvalidRefundAmount",
        MarketError::RefundExceedsPayment { .. } => "RefundExceedsPayment",
        MarketError::QueryError(_) => "QueryError",
    }
}
