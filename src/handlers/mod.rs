//! Command Handlers module
//!
//! Use cases that orchestrate the entity model, the record store and the
//! purchase aggregator. Each mutating use case runs in one store transaction.

mod cascade_handler;
mod client_handler;
mod commands;
mod payment_handler;
mod purchase_handler;


pub use cascade_handler::CascadeHandler;
pub use client_handler::ClientHandler;
pub use commands::*;
pub use payment_handler::PaymentHandler;
pub use purchase_handler::PurchaseHandler;
