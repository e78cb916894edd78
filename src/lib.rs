//! purchase_ledger Library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod domain;
pub mod handlers;
pub mod model;
pub mod projection;
pub mod store;

pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use error::{AppError, AppResult, ErrorResponse};
pub use domain::{Amount, AmountError, DomainError, ErrorCode, Money, OperationContext};
pub use model::{Client, Payment, Purchase, PurchaseStatus};
pub use store::{LedgerStore, MemoryStore, PgStore, SharedStore};
