//! Payment Handler
//!
//! Payment subledger: every operation that changes a payment's contribution
//! settles the parent purchase before its unit of work commits.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{DomainError, ErrorCode, OperationContext};
use crate::model::{Entity, Payment};
use crate::projection::settle_purchase;
use crate::store::{PageRequest, PaymentFilter, SharedStore};

use super::{CreatePaymentCommand, PaymentResult, UpdatePaymentCommand};

/// Reject a payment that is recorded against another purchase
fn ensure_linked(payment: &Payment, purchase_id: Uuid) -> Result<(), DomainError> {
    if payment.belongs_to(purchase_id) {
        Ok(())
    } else {
        Err(DomainError::BusinessRule(ErrorCode::PaymentNotLinked))
    }
}

/// Handler for payment operations scoped to a purchase
#[derive(Clone)]
pub struct PaymentHandler {
    store: SharedStore,
}

impl PaymentHandler {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Record a payment and settle its purchase
    pub async fn create(
        &self,
        command: CreatePaymentCommand,
        context: &OperationContext,
    ) -> Result<PaymentResult, DomainError> {
        let draft = command.payment.into_draft()?;
        let now = Utc::now();

        let mut tx = self.store.begin().await?;

        let purchase = tx
            .get_purchase(command.purchase_id)
            .await?
            .ok_or(DomainError::BusinessRule(ErrorCode::PurchaseNotFound))?;

        if !purchase.is_active() {
            return Err(DomainError::BusinessRule(ErrorCode::PaymentPurchaseInactive));
        }

        let payment = Payment::create(Uuid::new_v4(), purchase.id(), draft, now);
        tx.insert_payment(&payment).await?;

        let purchase = settle_purchase(tx.as_mut(), purchase.id(), now).await?;
        tx.commit().await?;

        tracing::info!(
            correlation_id = ?context.correlation_id,
            client_ip = ?context.client_ip,
            "Payment {} of {} recorded for purchase {} (paid {}, outstanding {}, {})",
            payment.id(),
            payment.amount(),
            purchase.id(),
            purchase.total_paid_value(),
            purchase.outstanding(),
            purchase.status()
        );

        Ok(PaymentResult { payment, purchase })
    }

    /// Change payment fields; a new amount re-settles the purchase
    pub async fn update(
        &self,
        command: UpdatePaymentCommand,
        context: &OperationContext,
    ) -> Result<PaymentResult, DomainError> {
        let changes = command.changes()?;
        let now = Utc::now();

        let mut tx = self.store.begin().await?;

        // Purchase row before payment row
        let purchase = tx.get_purchase(command.purchase_id).await?;

        let mut payment = tx
            .get_payment(command.payment_id)
            .await?
            .ok_or(DomainError::NotFound(ErrorCode::PaymentNotFound))?;
        ensure_linked(&payment, command.purchase_id)?;
        let purchase = purchase.ok_or(DomainError::NotFound(ErrorCode::PurchaseNotFound))?;

        let amount_changed = payment.apply_changes(changes, now);
        tx.update_payment(&payment).await?;

        let purchase = if amount_changed && payment.is_active() {
            settle_purchase(tx.as_mut(), command.purchase_id, now).await?
        } else {
            purchase
        };

        tx.commit().await?;

        tracing::info!(
            correlation_id = ?context.correlation_id,
            client_ip = ?context.client_ip,
            "Payment {} updated (amount changed: {})",
            payment.id(),
            amount_changed
        );

        Ok(PaymentResult { payment, purchase })
    }

    /// Reactivate a payment. Already-active payments are returned unchanged.
    pub async fn activate(
        &self,
        purchase_id: Uuid,
        payment_id: Uuid,
        context: &OperationContext,
    ) -> Result<PaymentResult, DomainError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let purchase = tx
            .get_purchase(purchase_id)
            .await?
            .ok_or(DomainError::NotFound(ErrorCode::PurchaseNotFound))?;

        let mut payment = tx
            .get_payment(payment_id)
            .await?
            .ok_or(DomainError::NotFound(ErrorCode::PaymentNotFound))?;
        ensure_linked(&payment, purchase_id)?;

        if !purchase.is_active() {
            return Err(DomainError::invalid(ErrorCode::PurchaseInactive));
        }

        if !payment.set_active(true, now) {
            tracing::debug!("Payment {} already active", payment_id);
            return Ok(PaymentResult { payment, purchase });
        }

        tx.update_payment(&payment).await?;
        let purchase = settle_purchase(tx.as_mut(), purchase_id, now).await?;
        tx.commit().await?;

        tracing::info!(
            correlation_id = ?context.correlation_id,
            client_ip = ?context.client_ip,
            "Payment {} activated (purchase {} paid {}, {})",
            payment_id,
            purchase_id,
            purchase.total_paid_value(),
            purchase.status()
        );

        Ok(PaymentResult { payment, purchase })
    }

    /// Deactivate a payment and settle its purchase.
    ///
    /// Returns `false` when the payment was already inactive.
    pub async fn deactivate(
        &self,
        purchase_id: Uuid,
        payment_id: Uuid,
        context: &OperationContext,
    ) -> Result<bool, DomainError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let purchase = tx.get_purchase(purchase_id).await?;

        let mut payment = tx
            .get_payment(payment_id)
            .await?
            .ok_or(DomainError::NotFound(ErrorCode::PaymentNotFound))?;
        ensure_linked(&payment, purchase_id)?;
        purchase.ok_or(DomainError::NotFound(ErrorCode::PurchaseNotFound))?;

        if !payment.set_active(false, now) {
            tracing::debug!("Payment {} already inactive", payment_id);
            return Ok(false);
        }

        tx.update_payment(&payment).await?;
        let purchase = settle_purchase(tx.as_mut(), purchase_id, now).await?;
        tx.commit().await?;

        tracing::info!(
            correlation_id = ?context.correlation_id,
            client_ip = ?context.client_ip,
            "Payment {} deactivated (purchase {} paid {}, {})",
            payment_id,
            purchase_id,
            purchase.total_paid_value(),
            purchase.status()
        );

        Ok(true)
    }

    pub async fn get(&self, purchase_id: Uuid, payment_id: Uuid) -> Result<Payment, DomainError> {
        let payment = self
            .store
            .get_payment(payment_id)
            .await?
            .ok_or(DomainError::NotFound(ErrorCode::PaymentNotFound))?;
        ensure_linked(&payment, purchase_id)?;
        Ok(payment)
    }

    /// List payments, newest first. A purchase filter must name an existing purchase.
    pub async fn list(
        &self,
        filter: PaymentFilter,
        page: PageRequest,
    ) -> Result<Vec<Payment>, DomainError> {
        if let Some(purchase_id) = filter.purchase_id {
            self.store
                .get_purchase(purchase_id)
                .await?
                .ok_or(DomainError::NotFound(ErrorCode::PurchaseNotFound))?;
        }

        Ok(self.store.list_payments(filter, page).await?)
    }
}
