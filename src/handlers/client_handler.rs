//! Client Handler
//!
//! Registration, profile updates and queries for clients.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{DomainError, ErrorCode, OperationContext};
use crate::model::{Client, Purchase};
use crate::store::{ClientFilter, PageRequest, PurchaseFilter, SharedStore};

use super::{CreateClientCommand, UpdateClientCommand};

/// Handler for client operations
#[derive(Clone)]
pub struct ClientHandler {
    store: SharedStore,
}

impl ClientHandler {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        command: CreateClientCommand,
        context: &OperationContext,
    ) -> Result<Client, DomainError> {
        let client = Client::create(
            Uuid::new_v4(),
            &command.name,
            command.nickname.as_deref(),
            command.phone,
            command.email,
            Utc::now(),
        )?;

        let mut tx = self.store.begin().await?;
        tx.insert_client(&client).await?;
        tx.commit().await?;

        tracing::info!(
            correlation_id = ?context.correlation_id,
            client_ip = ?context.client_ip,
            "Client {} created",
            client.id
        );

        Ok(client)
    }

    pub async fn update(
        &self,
        command: UpdateClientCommand,
        context: &OperationContext,
    ) -> Result<Client, DomainError> {
        if command.changes.is_empty() {
            return Err(DomainError::invalid(ErrorCode::DataFieldsEmpty));
        }

        let mut tx = self.store.begin().await?;

        let mut client = tx
            .get_client(command.client_id)
            .await?
            .ok_or(DomainError::NotFound(ErrorCode::ClientNotFound))?;

        client.apply_changes(command.changes, Utc::now())?;
        tx.update_client(&client).await?;
        tx.commit().await?;

        tracing::info!(
            correlation_id = ?context.correlation_id,
            client_ip = ?context.client_ip,
            "Client {} updated",
            client.id
        );

        Ok(client)
    }

    pub async fn get(&self, client_id: Uuid) -> Result<Client, DomainError> {
        self.store
            .get_client(client_id)
            .await?
            .ok_or(DomainError::NotFound(ErrorCode::ClientNotFound))
    }

    /// List clients, newest first
    pub async fn list(
        &self,
        filter: ClientFilter,
        page: PageRequest,
    ) -> Result<Vec<Client>, DomainError> {
        Ok(self.store.list_clients(filter, page).await?)
    }

    /// Purchases of one client, newest first
    pub async fn list_purchases(
        &self,
        client_id: Uuid,
        include_inactive: bool,
        page: PageRequest,
    ) -> Result<Vec<Purchase>, DomainError> {
        self.get(client_id).await?;

        let filter = PurchaseFilter {
            client_id: Some(client_id),
            include_inactive,
            outstanding_only: false,
        };
        Ok(self.store.list_purchases(filter, page).await?)
    }
}
