//! Domain module
//!
//! Core domain types: money primitives, error taxonomy, operation context.

pub mod amount;
pub mod context;
pub mod error;

pub use amount::{Amount, AmountError, Money, MINOR_UNITS};
pub use context::OperationContext;
pub use error::{DomainError, ErrorCode, ErrorKind};
