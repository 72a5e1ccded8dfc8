//! # Harvest Hub market API
//!
//! The `market_api` module exposes the programmatic API of the marketplace engine. It is modular, so that clients can
//! pick the parts they need, each backed by whichever database backend implements the relevant traits.
//!
//! * [`checkout_api`] validates a customer's cart and places the order, reserving inventory for every line.
//! * [`order_flow_api`] moves orders through fulfilment on behalf of producers, handles customer cancellations and
//!   answers order queries.
//! * [`payment_api`] records payments, reconciles processor callbacks against orders, and issues refunds.
//! * [`catalog_api`] manages product listings and reports stock levels.
//!
//! The other submodules hold the request, result and error types shared by the APIs.
//!
//! # API usage
//!
//! Every API is created by supplying a database backend and the event producers that should be notified of changes.
//! Events are published only after the change they describe has been committed.
//!
//! ```rust,ignore
//! use harvest_engine::{events::EventProducers, CheckoutApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/harvest_hub.db", 25).await?;
//! let api = CheckoutApi::new(db, EventProducers::default());
//! let order = api.checkout(new_order).await?;
//! ```

pub mod catalog_api;
pub mod checkout_api;
pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_api;
pub mod payment_objects;
