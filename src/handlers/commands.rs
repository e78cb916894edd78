//! Command definitions
//!
//! Commands represent intentions to change the system state. Money fields
//! arrive as raw decimals and are validated by the handler that runs them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Amount, DomainError, ErrorCode};
use crate::model::{ClientChanges, Payment, PaymentChanges, PaymentDraft, Purchase, PurchaseChanges};

// =========================================================================
// Clients
// =========================================================================

/// Command to register a new client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClientCommand {
    pub name: String,
    pub nickname: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl CreateClientCommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nickname: None,
            phone: None,
            email: None,
        }
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Command to change a client's profile fields
#[derive(Debug, Clone)]
pub struct UpdateClientCommand {
    pub client_id: Uuid,
    pub changes: ClientChanges,
}

impl UpdateClientCommand {
    pub fn new(client_id: Uuid, changes: ClientChanges) -> Self {
        Self { client_id, changes }
    }
}

// =========================================================================
// Payments
// =========================================================================

/// Payment fields as supplied by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub amount: Decimal,
    pub method: String,
    pub payment_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub receipt_number: Option<String>,
}

impl NewPayment {
    pub fn new(amount: Decimal, method: impl Into<String>) -> Self {
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

    /// Validate amount and method and turn the fields into a draft
    pub fn into_draft(self) -> Result<PaymentDraft, DomainError> {
        Ok(PaymentDraft {
            amount: payment_amount(self.amount)?,
            method: payment_method(&self.method)?,
            payment_date: self.payment_date,
            description: self.description,
            receipt_number: self.receipt_number,
        })
    }
}

/// Command to record a payment against a purchase
#[derive(Debug, Clone)]
pub struct CreatePaymentCommand {
    pub purchase_id: Uuid,
    pub payment: NewPayment,
}

impl CreatePaymentCommand {
    pub fn new(purchase_id: Uuid, payment: NewPayment) -> Self {
        Self { purchase_id, payment }
    }
}

/// Command to change a payment's fields
#[derive(Debug, Clone, Default)]
pub struct UpdatePaymentCommand {
    pub purchase_id: Uuid,
    pub payment_id: Uuid,
    pub amount: Option<Decimal>,
    pub payment_date: Option<DateTime<Utc>>,
    pub method: Option<String>,
    pub description: Option<String>,
}

impl UpdatePaymentCommand {
    pub fn new(purchase_id: Uuid, payment_id: Uuid) -> Self {
        Self {
            purchase_id,
            payment_id,
            ..Default::default()
        }
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_payment_date(mut self, date: DateTime<Utc>) -> Self {
        self.payment_date = Some(date);
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Validate the supplied fields
    pub fn changes(&self) -> Result<PaymentChanges, DomainError> {
        let changes = PaymentChanges {
            amount: self.amount.map(payment_amount).transpose()?,
            payment_date: self.payment_date,
            method: self.method.as_deref().map(payment_method).transpose()?,
            description: self.description.clone(),
        };

        if changes.is_empty() {
            return Err(DomainError::invalid(ErrorCode::DataFieldsEmpty));
        }
        Ok(changes)
    }
}

// =========================================================================
// Purchases
// =========================================================================

/// Command to open a purchase for a client
#[derive(Debug, Clone)]
pub struct CreatePurchaseCommand {
    pub client_id: Uuid,
    pub description: String,
    pub total_value: Decimal,
    pub note_number: Option<String>,
    /// Recorded in the same unit of work as the purchase
    pub initial_payment: Option<NewPayment>,
}

impl CreatePurchaseCommand {
    pub fn new(client_id: Uuid, description: impl Into<String>, total_value: Decimal) -> Self {
        Self {
            client_id,
            description: description.into(),
            total_value,
            note_number: None,
            initial_payment: None,
        }
    }

    pub fn with_note_number(mut self, note_number: impl Into<String>) -> Self {
        self.note_number = Some(note_number.into());
        self
    }

    pub fn with_initial_payment(mut self, payment: NewPayment) -> Self {
        self.initial_payment = Some(payment);
        self
    }
}

/// Command to change a purchase's fields
#[derive(Debug, Clone, Default)]
pub struct UpdatePurchaseCommand {
    pub purchase_id: Uuid,
    pub description: Option<String>,
    pub total_value: Option<Decimal>,
    pub client_id: Option<Uuid>,
}

impl UpdatePurchaseCommand {
    pub fn new(purchase_id: Uuid) -> Self {
        Self {
            purchase_id,
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_total_value(mut self, total_value: Decimal) -> Self {
        self.total_value = Some(total_value);
        self
    }

    pub fn with_client_id(mut self, client_id: Uuid) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Validate the supplied fields
    pub fn changes(&self) -> Result<PurchaseChanges, DomainError> {
        let changes = PurchaseChanges {
            description: self.description.clone(),
            total_value: self.total_value.map(purchase_total).transpose()?,
            client_id: self.client_id,
        };

        if changes.is_empty() {
            return Err(DomainError::invalid(ErrorCode::DataFieldsEmpty));
        }
        Ok(changes)
    }
}

// =========================================================================
// Results
// =========================================================================

/// A payment together with its parent purchase after settlement
#[derive(Debug, Clone, Serialize)]
pub struct PaymentResult {
    pub payment: Payment,
    pub purchase: Purchase,
}

/// A newly created purchase and its initial payment, if any
#[derive(Debug, Clone, Serialize)]
pub struct CreatePurchaseResult {
    pub purchase: Purchase,
    pub initial_payment: Option<Payment>,
}

// =========================================================================
// Money validation
// =========================================================================

pub(crate) fn payment_amount(value: Decimal) -> Result<Amount, DomainError> {
    Amount::new(value).map_err(|e| DomainError::invalid_because(ErrorCode::PaymentInvalidAmount, e))
}

pub(crate) fn payment_method(value: &str) -> Result<String, DomainError> {
    let method = value.trim();
    if method.is_empty() {
        return Err(DomainError::invalid(ErrorCode::PaymentInvalidMethod));
    }
    Ok(method.to_string())
}

pub(crate) fn purchase_total(value: Decimal) -> Result<Amount, DomainError> {
    Amount::new(value).map_err(|e| DomainError::invalid_because(ErrorCode::PurchaseInvalidTotal, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_payment_into_draft() {
        let draft = NewPayment::new(dec!(50), "  Pix ")
            .with_receipt_number("REC-0001")
            .into_draft()
            .unwrap();

        assert_eq!(draft.amount.value(), dec!(50));
        assert_eq!(draft.method, "Pix");
    }

    #[test]
    fn test_payment_method_must_not_be_blank() {
        for method in ["", "   "] {
            let err = NewPayment::new(dec!(10), method).into_draft().unwrap_err();
            assert_eq!(err, DomainError::invalid(ErrorCode::PaymentInvalidMethod));
        }

        let err = UpdatePaymentCommand::new(Uuid::new_v4(), Uuid::new_v4())
            .with_method(" ")
            .changes()
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::PaymentInvalidMethod);
    }

    #[test]
    fn test_new_payment_rejects_non_positive() {
        for amount in [dec!(0), dec!(-10)] {
            let err = NewPayment::new(amount, "Pix").into_draft().unwrap_err();
            assert_eq!(err.code(), ErrorCode::PaymentInvalidAmount);
        }
    }

    #[test]
    fn test_update_payment_requires_fields() {
        let cmd = UpdatePaymentCommand::new(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(cmd.changes(), Err(DomainError::invalid(ErrorCode::DataFieldsEmpty)));

        let cmd = cmd.with_method("Card");
        assert_eq!(cmd.changes().unwrap().method.as_deref(), Some("Card"));
    }

    #[test]
    fn test_update_purchase_validates_total() {
        let err = UpdatePurchaseCommand::new(Uuid::new_v4())
            .with_total_value(dec!(0))
            .changes()
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::PurchaseInvalidTotal);

        let changes = UpdatePurchaseCommand::new(Uuid::new_v4())
            .with_total_value(dec!(150.50))
            .changes()
            .unwrap();
        assert_eq!(changes.total_value.map(|t| t.value()), Some(dec!(150.50)));
    }

    #[test]
    fn test_create_client_command_builder() {
        let cmd = CreateClientCommand::new("Maria")
            .with_nickname("mari")
            .with_email("maria@example.com");

        assert_eq!(cmd.name, "Maria");
        assert_eq!(cmd.nickname.as_deref(), Some("mari"));
        assert!(cmd.phone.is_none());
    }
}
