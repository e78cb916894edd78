//! Entity model
//!
//! In-memory representations of the ledger entities. Every entity is
//! soft-deleted through its activation flag and never physically removed.

pub mod client;
pub mod payment;
pub mod purchase;

pub use client::{normalize_nickname, Client, ClientChanges};
pub use payment::{Payment, PaymentChanges, PaymentDraft};
pub use purchase::{Purchase, PurchaseChanges, PurchaseStatus, Settlement};

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Entity trait that all ledger records implement
pub trait Entity: Clone {
    /// Get the entity ID
    fn id(&self) -> Uuid;

    fn is_active(&self) -> bool;

    fn created_at(&self) -> DateTime<Utc>;

    fn updated_at(&self) -> DateTime<Utc>;

    /// Flip the activation flag.
    ///
    /// Returns `false` and leaves the entity untouched (including
    /// `updated_at`) when it is already in the target state.
    fn set_active(&mut self, active: bool, now: DateTime<Utc>) -> bool;
}

/// Trim an optional text field, treating blank input as absent
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  NF-0001 ".to_string())), Some("NF-0001".to_string()));
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(None), None);
    }
}
