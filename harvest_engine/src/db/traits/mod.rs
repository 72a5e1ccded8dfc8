//! #  Database management and control.
//!
//! This module defines the interface contracts of the marketplace database *backends*. The market APIs are generic
//! over these traits, so a backend only has to implement the traits for the APIs it will be used with.
//!
//! ## Traits
//!
//! * [`CatalogManagement`] stores producer listings: prices, availability and the initial stock level.
//! * [`InventoryLedger`] is the only way stock levels change. Reservations are conditional and can never take a
//!   product's stock below zero.
//! * [`OrderManagement`] places orders (atomically reserving inventory for every line), runs status changes through
//!   the order state machine, and answers order queries.
//! * [`PaymentManagement`] records payments, settles or fails them, and applies refunds, keeping the order in step.
//!
//! Every mutating method is atomic: it either applies all of its effects or none of them.
mod catalog_management;
mod inventory_ledger;
mod order_management;
mod payment_management;

pub use catalog_management::CatalogManagement;
pub use inventory_ledger::InventoryLedger;
pub use order_management::OrderManagement;
pub use payment_management::PaymentManagement;
