//! Projection module
//!
//! Keeps the derived purchase fields (paid total, status) in step with
//! the payments they are derived from.

mod aggregator;

pub use aggregator::{recompute, settle_purchase};
