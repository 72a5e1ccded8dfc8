//! # Harvest Hub server
//! The HTTP boundary of the Harvest Hub marketplace. It is responsible for:
//! * Exposing checkout, order fulfilment, payment and catalog operations as JSON endpoints.
//! * Identifying the caller from the principal headers set by the identity gateway, and checking their role.
//! * Emailing customers when their orders and payments change.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/checkout`, `/api/orders/..`, `/api/payments/..`, `/api/products/..`: see [routes](routes/index.html).

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod middleware;
pub mod notifications;
pub mod principal;
pub mod routes;
pub mod server;
