//! Purchase entity and its settlement state

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::{Amount, Money};

use super::{non_blank, Entity};

/// Settlement status derived from the paid total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Pending,
    Partial,
    Paid,
}

impl PurchaseStatus {
    /// Classify a paid total against the purchase total.
    ///
    /// Paying more than the total is still `Paid`.
    pub fn classify(paid: &Money, total: &Amount) -> Self {
        if paid.covers(total) {
            Self::Paid
        } else if paid.is_zero() {
            Self::Pending
        } else {
            Self::Partial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Paid => "paid",
        }
    }

    /// Whether the purchase still has an open balance
    pub fn is_outstanding(&self) -> bool {
        !matches!(self, Self::Paid)
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "partial" => Ok(Self::Partial),
            "paid" => Ok(Self::Paid),
            other => Err(format!("unknown purchase status: {other}")),
        }
    }
}

/// The derived aggregate fields of a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub total_paid_value: Money,
    pub status: PurchaseStatus,
}

impl Settlement {
    /// Nothing paid
    pub fn unpaid() -> Self {
        Self {
            total_paid_value: Money::zero(),
            status: PurchaseStatus::Pending,
        }
    }

    pub fn from_paid(paid: Money, total: &Amount) -> Self {
        Self {
            total_paid_value: paid,
            status: PurchaseStatus::classify(&paid, total),
        }
    }
}

/// A purchase made by a client, settled by payments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Purchase {
    pub(crate) id: Uuid,
    pub(crate) client_id: Uuid,
    pub(crate) description: String,
    pub(crate) total_value: Amount,

    /// Sum of active payment amounts
    pub(crate) total_paid_value: Money,

    pub(crate) status: PurchaseStatus,
    pub(crate) note_number: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

/// Validated field changes for a purchase update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PurchaseChanges {
    pub description: Option<String>,
    pub total_value: Option<Amount>,
    pub client_id: Option<Uuid>,
}

impl PurchaseChanges {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.total_value.is_none() && self.client_id.is_none()
    }
}

impl Purchase {
    /// Create a new active, unpaid purchase
    pub fn create(
        id: Uuid,
        client_id: Uuid,
        description: &str,
        total_value: Amount,
        note_number: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            client_id,
            description: description.trim().to_string(),
            total_value,
            total_paid_value: Money::zero(),
            status: PurchaseStatus::Pending,
            note_number: non_blank(note_number),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply field changes. The settlement is left for the aggregator.
    pub fn apply_changes(&mut self, changes: PurchaseChanges, now: DateTime<Utc>) {
        if let Some(description) = changes.description {
            self.description = description.trim().to_string();
        }
        if let Some(total_value) = changes.total_value {
            self.total_value = total_value;
        }
        if let Some(client_id) = changes.client_id {
            self.client_id = client_id;
        }
        self.updated_at = now;
    }

    pub fn settlement(&self) -> Settlement {
        Settlement {
            total_paid_value: self.total_paid_value,
            status: self.status,
        }
    }

    /// Overwrite the aggregate fields
    pub(crate) fn apply_settlement(&mut self, settlement: Settlement, now: DateTime<Utc>) {
        self.total_paid_value = settlement.total_paid_value;
        self.status = settlement.status;
        self.updated_at = now;
    }

    /// Remaining balance, zero once paid
    pub fn outstanding(&self) -> Money {
        let remaining = self.total_value.value() - self.total_paid_value.value();
        Money::new(remaining.max(Decimal::ZERO)).unwrap_or_default()
    }

    /// Amount paid beyond the total, if any
    pub fn overpayment(&self) -> Option<Money> {
        let excess = self.total_paid_value.value() - self.total_value.value();
        if excess > Decimal::ZERO {
            Money::new(excess).ok()
        } else {
            None
        }
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn total_value(&self) -> Amount {
        self.total_value
    }

    pub fn total_paid_value(&self) -> Money {
        self.total_paid_value
    }

    pub fn status(&self) -> PurchaseStatus {
        self.status
    }

    pub fn note_number(&self) -> Option<&str> {
        self.note_number.as_deref()
    }
}

impl Entity for Purchase {
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

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn amount(value: Decimal) -> Amount {
        Amount::new(value).unwrap()
    }

    fn money(value: Decimal) -> Money {
        Money::new(value).unwrap()
    }

    fn purchase(total: Decimal) -> Purchase {
        Purchase::create(
            Uuid::new_v4(),
            Uuid::new_v4(),
            " Notebook ",
            amount(total),
            Some(" NF-0001 ".to_string()),
            Utc::now(),
        )
    }

    #[test]
    fn test_status_thresholds() {
        let total = amount(dec!(100));

        assert_eq!(PurchaseStatus::classify(&Money::zero(), &total), PurchaseStatus::Pending);
        assert_eq!(PurchaseStatus::classify(&money(dec!(0.01)), &total), PurchaseStatus::Partial);
        assert_eq!(PurchaseStatus::classify(&money(dec!(99.99)), &total), PurchaseStatus::Partial);
        assert_eq!(PurchaseStatus::classify(&money(dec!(100)), &total), PurchaseStatus::Paid);
        assert_eq!(PurchaseStatus::classify(&money(dec!(110)), &total), PurchaseStatus::Paid);
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(serde_json::to_string(&PurchaseStatus::Partial).unwrap(), "\"partial\"");
        assert_eq!("paid".parse::<PurchaseStatus>(), Ok(PurchaseStatus::Paid));
        assert!("overpaid".parse::<PurchaseStatus>().is_err());
    }

    #[test]
    fn test_purchase_create() {
        let purchase = purchase(dec!(100));

        assert_eq!(purchase.description(), "Notebook");
        assert_eq!(purchase.note_number(), Some("NF-0001"));
        assert_eq!(purchase.settlement(), Settlement::unpaid());
        assert!(purchase.is_active());
    }

    #[test]
    fn test_outstanding_and_overpayment() {
        let mut purchase = purchase(dec!(100));
        let now = Utc::now();

        purchase.apply_settlement(Settlement::from_paid(money(dec!(40)), &purchase.total_value()), now);
        assert_eq!(purchase.status(), PurchaseStatus::Partial);
        assert_eq!(purchase.outstanding().value(), dec!(60));
        assert_eq!(purchase.overpayment(), None);

        purchase.apply_settlement(Settlement::from_paid(money(dec!(110)), &purchase.total_value()), now);
        assert_eq!(purchase.status(), PurchaseStatus::Paid);
        assert!(purchase.outstanding().is_zero());
        assert_eq!(purchase.overpayment(), Some(money(dec!(10))));
    }

    #[test]
    fn test_apply_changes_keeps_settlement() {
        let mut purchase = purchase(dec!(100));
        let client_id = Uuid::new_v4();

        purchase.apply_changes(
            PurchaseChanges {
                total_value: Some(amount(dec!(250))),
                client_id: Some(client_id),
                ..Default::default()
            },
            Utc::now(),
        );

        assert_eq!(purchase.total_value(), amount(dec!(250)));
        assert_eq!(purchase.client_id(), client_id);
        assert_eq!(purchase.settlement(), Settlement::unpaid());
    }
}
