//! Cascade Handler
//!
//! Activation and deactivation across the Client -> Purchase -> Payment
//! tree. A whole cascade commits as one unit of work or not at all.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{DomainError, ErrorCode, OperationContext};
use crate::model::{Client, Entity, Purchase, Settlement};
use crate::projection::settle_purchase;
use crate::store::{LedgerTx, SharedStore};

/// Deactivate a purchase with all of its active payments and reset its
/// settlement. Returns the number of payments deactivated.
async fn retire_purchase(
    tx: &mut dyn LedgerTx,
    purchase: &mut Purchase,
    now: DateTime<Utc>,
) -> Result<u64, DomainError> {
    purchase.set_active(false, now);
    let payments = tx.deactivate_payments_of(purchase.id(), now).await?;
    purchase.apply_settlement(Settlement::unpaid(), now);
    tx.update_purchase(purchase).await?;
    Ok(payments)
}

/// Handler for soft-delete cascades
#[derive(Clone)]
pub struct CascadeHandler {
    store: SharedStore,
}

impl CascadeHandler {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Deactivate a purchase and its payments.
    ///
    /// Returns `false` when the purchase was already inactive.
    pub async fn deactivate_purchase(
        &self,
        purchase_id: Uuid,
        context: &OperationContext,
    ) -> Result<bool, DomainError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let mut purchase = tx
            .get_purchase(purchase_id)
            .await?
            .ok_or(DomainError::NotFound(ErrorCode::PurchaseNotFound))?;

        if !purchase.is_active() {
            tracing::debug!("Purchase {} already inactive", purchase_id);
            return Ok(false);
        }

        let payments = retire_purchase(tx.as_mut(), &mut purchase, now).await?;
        tx.commit().await?;

        tracing::info!(
            correlation_id = ?context.correlation_id,
            client_ip = ?context.client_ip,
            "Purchase {} deactivated with {} payment(s)",
            purchase_id,
            payments
        );

        Ok(true)
    }

    /// Reactivate a purchase and settle it from whatever payments are active.
    /// Payments stay inactive. Already-active purchases are returned unchanged.
    pub async fn activate_purchase(
        &self,
        purchase_id: Uuid,
        context: &OperationContext,
    ) -> Result<Purchase, DomainError> {
        let now = Utc::now();

        let (mut tx, mut purchase, client) = loop {
            let current = self
                .store
                .get_purchase(purchase_id)
                .await?
                .ok_or(DomainError::NotFound(ErrorCode::PurchaseNotFound))?;

            if current.is_active() {
                tracing::debug!("Purchase {} already active", purchase_id);
                return Ok(current);
            }

            // Client row before purchase row
            let mut tx = self.store.begin().await?;
            let client = tx.get_client(current.client_id()).await?;
            let purchase = tx
                .get_purchase(purchase_id)
                .await?
                .ok_or(DomainError::NotFound(ErrorCode::PurchaseNotFound))?;

            if purchase.client_id() == current.client_id() {
                break (tx, purchase, client);
            }
            tracing::debug!("Purchase {} moved to another client, retrying", purchase_id);
        };

        if purchase.is_active() {
            return Ok(purchase);
        }

        let client = client.ok_or(DomainError::BusinessRule(ErrorCode::ClientNotFound))?;
        if !client.is_active() {
            return Err(DomainError::BusinessRule(ErrorCode::ClientInactive));
        }

        purchase.set_active(true, now);
        tx.update_purchase(&purchase).await?;
        let purchase = settle_purchase(tx.as_mut(), purchase_id, now).await?;
        tx.commit().await?;

        tracing::info!(
            correlation_id = ?context.correlation_id,
            client_ip = ?context.client_ip,
            "Purchase {} activated (paid {}, {})",
            purchase_id,
            purchase.total_paid_value(),
            purchase.status()
        );

        Ok(purchase)
    }

    /// Deactivate a client together with every active purchase and payment
    /// beneath it.
    ///
    /// Returns `false` when the client was already inactive.
    pub async fn deactivate_client(
        &self,
        client_id: Uuid,
        context: &OperationContext,
    ) -> Result<bool, DomainError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let mut client = tx
            .get_client(client_id)
            .await?
            .ok_or(DomainError::NotFound(ErrorCode::ClientNotFound))?;

        if !client.set_active(false, now) {
            tracing::debug!("Client {} already inactive", client_id);
            return Ok(false);
        }
        tx.update_client(&client).await?;

        // Snapshot the tree before mutating it
        let purchase_ids = tx.active_purchase_ids(client_id).await?;

        let mut payments = 0;
        for purchase_id in &purchase_ids {
            let mut purchase = tx
                .get_purchase(*purchase_id)
                .await?
                .ok_or(DomainError::NotFound(ErrorCode::PurchaseNotFound))?;

            // Reassigned or retired while the snapshot was taken
            if purchase.client_id() != client_id || !purchase.is_active() {
                continue;
            }
            payments += retire_purchase(tx.as_mut(), &mut purchase, now).await?;
        }

        tx.commit().await?;

        tracing::info!(
            correlation_id = ?context.correlation_id,
            client_ip = ?context.client_ip,
            "Client {} deactivated with {} purchase(s) and {} payment(s)",
            client_id,
            purchase_ids.len(),
            payments
        );

        Ok(true)
    }

    /// Reactivate a client. Purchases stay inactive.
    pub async fn activate_client(
        &self,
        client_id: Uuid,
        context: &OperationContext,
    ) -> Result<Client, DomainError> {
        let mut tx = self.store.begin().await?;

        let mut client = tx
            .get_client(client_id)
            .await?
            .ok_or(DomainError::NotFound(ErrorCode::ClientNotFound))?;

        if !client.set_active(true, Utc::now()) {
            tracing::debug!("Client {} already active", client_id);
            return Ok(client);
        }

        tx.update_client(&client).await?;
        tx.commit().await?;

        tracing::info!(
            correlation_id = ?context.correlation_id,
            client_ip = ?context.client_ip,
            "Client {} activated",
            client_id
        );

        Ok(client)
    }
}
