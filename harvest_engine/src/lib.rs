//! Harvest Hub marketplace engine
//!
//! Harvest Hub connects local food producers with customers. This library holds the core of the marketplace: turning
//! carts into orders, keeping stock levels honest, moving orders through fulfilment, and reconciling payments and
//! refunds against orders. It is transport-agnostic; the HTTP server lives in a separate crate.
//!
//! The library is divided into these sections:
//! 1. Database management and control ([`mod@db`]). SQLite is the supported backend. You should never need to access
//!    the database directly. Instead, use the public API provided by the engine. The exception is the data types used
//!    in the database. These are defined in the `db_types` module and are public.
//! 2. The order status state machine ([`mod@order_status`]), the single source of truth for which status changes are
//!    allowed, and what they do to inventory.
//! 3. The market API ([`mod@market_api`]). This provides the public-facing functionality of the engine. Backends
//!    implement the traits in [`mod@db::traits`] in order to act as a backend for the APIs.
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted once a change has
//! been committed. For example, when a customer checks out, an `OrderCreatedEvent` is emitted.
pub mod db;

pub mod db_types;
pub mod events;
pub mod market_api;
pub mod order_status;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use db::traits::{CatalogManagement, InventoryLedger, OrderManagement, PaymentManagement};
pub use market_api::{
    catalog_api::CatalogApi,
    checkout_api::CheckoutApi,
    errors::{ErrorKind, MarketError},
    order_flow_api::OrderFlowApi,
    order_objects,
    payment_api::PaymentApi,
    payment_objects,
};
