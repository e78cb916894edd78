//! Purchase Handler
//!
//! Creation, field updates and queries for purchases. Activation state
//! changes live in the cascade handler.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{DomainError, ErrorCode, OperationContext};
use crate::model::{Entity, Payment, Purchase};
use crate::projection::settle_purchase;
use crate::store::{LedgerTx, PageRequest, PurchaseFilter, SharedStore};

use super::commands::purchase_total;
use super::{CreatePurchaseCommand, CreatePurchaseResult, NewPayment, UpdatePurchaseCommand};

/// Require an existing, active client for a purchase to belong to
async fn ensure_client_accepts_purchases(
    tx: &mut dyn LedgerTx,
    client_id: Uuid,
) -> Result<(), DomainError> {
    let client = tx
        .get_client(client_id)
        .await?
        .ok_or(DomainError::BusinessRule(ErrorCode::ClientNotFound))?;

    if !client.is_active() {
        return Err(DomainError::BusinessRule(ErrorCode::ClientInactive));
    }
    Ok(())
}

/// Handler for purchase operations
#[derive(Clone)]
pub struct PurchaseHandler {
    store: SharedStore,
}

impl PurchaseHandler {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Open a purchase, optionally with a first payment in the same unit of work
    pub async fn create(
        &self,
        command: CreatePurchaseCommand,
        context: &OperationContext,
    ) -> Result<CreatePurchaseResult, DomainError> {
        let total_value = purchase_total(command.total_value)?;
        let draft = command
            .initial_payment
            .map(NewPayment::into_draft)
            .transpose()?;
        let now = Utc::now();

        let mut tx = self.store.begin().await?;
        ensure_client_accepts_purchases(tx.as_mut(), command.client_id).await?;

        let purchase = Purchase::create(
            Uuid::new_v4(),
            command.client_id,
            &command.description,
            total_value,
            command.note_number,
            now,
        );
        tx.insert_purchase(&purchase).await?;

        let (purchase, initial_payment) = match draft {
            Some(draft) => {
                let payment = Payment::create(Uuid::new_v4(), purchase.id(), draft, now);
                tx.insert_payment(&payment).await?;
                let purchase = settle_purchase(tx.as_mut(), purchase.id(), now).await?;
                (purchase, Some(payment))
            }
            None => (purchase, None),
        };

        tx.commit().await?;

        tracing::info!(
            correlation_id = ?context.correlation_id,
            client_ip = ?context.client_ip,
            "Purchase {} of {} created for client {} (paid {}, {})",
            purchase.id(),
            purchase.total_value(),
            purchase.client_id(),
            purchase.total_paid_value(),
            purchase.status()
        );

        Ok(CreatePurchaseResult {
            purchase,
            initial_payment,
        })
    }

    /// Change purchase fields; a new total re-settles the purchase
    pub async fn update(
        &self,
        command: UpdatePurchaseCommand,
        context: &OperationContext,
    ) -> Result<Purchase, DomainError> {
        let changes = command.changes()?;
        let now = Utc::now();

        let mut tx = self.store.begin().await?;

        // Client row before purchase row
        if let Some(client_id) = changes.client_id {
            ensure_client_accepts_purchases(tx.as_mut(), client_id).await?;
        }

        let mut purchase = tx
            .get_purchase(command.purchase_id)
            .await?
            .ok_or(DomainError::NotFound(ErrorCode::PurchaseNotFound))?;

        let total_changed = matches!(changes.total_value, Some(total) if total != purchase.total_value());
        purchase.apply_changes(changes, now);
        tx.update_purchase(&purchase).await?;

        let purchase = if total_changed {
            settle_purchase(tx.as_mut(), purchase.id(), now).await?
        } else {
            purchase
        };

        tx.commit().await?;

        tracing::info!(
            correlation_id = ?context.correlation_id,
            client_ip = ?context.client_ip,
            "Purchase {} updated (total {}, paid {}, {})",
            purchase.id(),
            purchase.total_value(),
            purchase.total_paid_value(),
            purchase.status()
        );

        Ok(purchase)
    }

    pub async fn get(&self, purchase_id: Uuid) -> Result<Purchase, DomainError> {
        self.store
            .get_purchase(purchase_id)
            .await?
            .ok_or(DomainError::NotFound(ErrorCode::PurchaseNotFound))
    }

    pub async fn get_by_note_number(&self, note_number: &str) -> Result<Purchase, DomainError> {
        self.store
            .find_purchase_by_note_number(note_number.trim())
            .await?
            .ok_or(DomainError::NotFound(ErrorCode::PurchaseNotFound))
    }

    /// List purchases, newest first
    pub async fn list(
        &self,
        filter: PurchaseFilter,
        page: PageRequest,
    ) -> Result<Vec<Purchase>, DomainError> {
        Ok(self.store.list_purchases(filter, page).await?)
    }
}
