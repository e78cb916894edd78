//! Payment entity

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::Amount;

use super::{non_blank, Entity};

/// A payment recorded against a purchase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payment {
    pub(crate) id: Uuid,
    pub(crate) purchase_id: Uuid,
    pub(crate) amount: Amount,
    pub(crate) payment_date: Option<DateTime<Utc>>,
    pub(crate) method: String,
    pub(crate) description: Option<String>,
    pub(crate) receipt_number: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

/// Everything needed to record a new payment, minus the owning purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentDraft {
    pub amount: Amount,
    pub method: String,
    pub payment_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub receipt_number: Option<String>,
}

impl PaymentDraft {
    pub fn new(amount: Amount, method: impl Into<String>) -> Self {
        Self {
            amount,
            method: method.into(),
            payment_date: None,
            description: None,
            receipt_number: None,
        }
    }

    pub fn with_payment_date(mut self, date: DateTime<Utc>) -> Self {
        self.payment_date = Some(date);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_receipt_number(mut self, receipt_number: impl Into<String>) -> Self {
        self.receipt_number = Some(receipt_number.into());
        self
    }
}

/// Validated field changes for a payment update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentChanges {
    pub amount: Option<Amount>,
    pub payment_date: Option<DateTime<Utc>>,
    pub method: Option<String>,
    pub description: Option<String>,
}

impl PaymentChanges {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.payment_date.is_none()
            && self.method.is_none()
            && self.description.is_none()
    }
}

impl Payment {
    /// Create a new active payment
    pub fn create(id: Uuid, purchase_id: Uuid, draft: PaymentDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            purchase_id,
            amount: draft.amount,
            payment_date: draft.payment_date,
            method: draft.method.trim().to_string(),
            description: non_blank(draft.description),
            receipt_number: non_blank(draft.receipt_number),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply field changes.
    ///
    /// Returns `true` when the amount actually changed.
    pub fn apply_changes(&mut self, changes: PaymentChanges, now: DateTime<Utc>) -> bool {
        let amount_changed = matches!(changes.amount, Some(amount) if amount != self.amount);

        if let Some(amount) = changes.amount {
            self.amount = amount;
        }
        if let Some(date) = changes.payment_date {
            self.payment_date = Some(date);
        }
        if let Some(method) = changes.method {
            self.method = method.trim().to_string();
        }
        if let Some(description) = changes.description {
            self.description = non_blank(Some(description));
        }
        self.updated_at = now;

        amount_changed
    }

    /// Whether this payment is recorded against the given purchase
    pub fn belongs_to(&self, purchase_id: Uuid) -> bool {
        self.purchase_id == purchase_id
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn purchase_id(&self) -> Uuid {
        self.purchase_id
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn payment_date(&self) -> Option<DateTime<Utc>> {
        self.payment_date
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn receipt_number(&self) -> Option<&str> {
        self.receipt_number.as_deref()
    }
}

impl Entity for Payment {
    fn id(&self) -> Uuid {
        self.id
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn set_active(&mut self, active: bool, now: DateTime<Utc>) -> bool {
        if self.is_active == active {
            return false;
        }
        self.is_active = active;
        self.updated_at = now;
        true
    }
}
