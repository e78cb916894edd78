//! Record Store module
//!
//! Durable CRUD and filtered-list storage for clients, purchases and payments.
//! Mutations go through a [`LedgerTx`] unit of work; dropping a transaction
//! without committing discards everything it wrote.

mod error;
mod memory;
mod postgres;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::model::{Client, Payment, Purchase};

/// Names of the integrity constraints, shared by every store implementation
pub mod constraints {
    pub const CLIENT_NICKNAME: &str = "clients_nickname_key";
    pub const PURCHASE_NOTE_NUMBER: &str = "purchases_note_number_key";
    pub const PAYMENT_RECEIPT_NUMBER: &str = "payments_receipt_number_key";
    pub const PURCHASE_CLIENT: &str = "purchases_client_id_fkey";
    pub const PAYMENT_PURCHASE: &str = "payments_purchase_id_fkey";
}

/// Shared handle to a store implementation
pub type SharedStore = Arc<dyn LedgerStore>;

pub type StoreResult<T> = Result<T, StoreError>;

// =========================================================================
// Listing
// =========================================================================

/// Plain limit/offset window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
}

impl PageRequest {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: limit.max(0),
            offset: offset.max(0),
        }
    }

    /// Apply the window to an already ordered list
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientFilter {
    pub include_inactive: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurchaseFilter {
    pub client_id: Option<Uuid>,
    pub include_inactive: bool,
    /// Keep pending and partial purchases only
    pub outstanding_only: bool,
}

impl PurchaseFilter {
    pub fn matches(&self, purchase: &Purchase) -> bool {
        self.client_id.map_or(true, |id| purchase.client_id == id)
            && (self.include_inactive || purchase.is_active)
            && (!self.outstanding_only || purchase.status.is_outstanding())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaymentFilter {
    pub purchase_id: Option<Uuid>,
    pub include_inactive: bool,
}

impl PaymentFilter {
    pub fn matches(&self, payment: &Payment) -> bool {
        self.purchase_id.map_or(true, |id| payment.purchase_id == id)
            && (self.include_inactive || payment.is_active)
    }
}

// =========================================================================
// Store traits
// =========================================================================

/// Read access and transaction factory. Reads never block on writers.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Start a unit of work
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>>;

    async fn get_client(&self, id: Uuid) -> StoreResult<Option<Client>>;

    /// Clients ordered by creation time, newest first
    async fn list_clients(&self, filter: ClientFilter, page: PageRequest) -> StoreResult<Vec<Client>>;

    async fn get_purchase(&self, id: Uuid) -> StoreResult<Option<Purchase>>;

    async fn find_purchase_by_note_number(&self, note_number: &str) -> StoreResult<Option<Purchase>>;

    /// Purchases ordered by creation time, newest first
    async fn list_purchases(
        &self,
        filter: PurchaseFilter,
        page: PageRequest,
    ) -> StoreResult<Vec<Purchase>>;

    async fn get_payment(&self, id: Uuid) -> StoreResult<Option<Payment>>;

    /// Payments ordered by creation time, newest first
    async fn list_payments(&self, filter: PaymentFilter, page: PageRequest)
        -> StoreResult<Vec<Payment>>;

    /// Check the backing store is reachable
    async fn ping(&self) -> StoreResult<()>;
}

/// A single atomic unit of work.
///
/// Rows read through a transaction are locked against concurrent writers
/// until it commits or is dropped.
#[async_trait]
pub trait LedgerTx: Send {
    async fn get_client(&mut self, id: Uuid) -> StoreResult<Option<Client>>;

    async fn get_purchase(&mut self, id: Uuid) -> StoreResult<Option<Purchase>>;

    async fn get_payment(&mut self, id: Uuid) -> StoreResult<Option<Payment>>;

    /// Active payments of a purchase
    async fn active_payments(&mut self, purchase_id: Uuid) -> StoreResult<Vec<Payment>>;

    /// Ids of the active purchases of a client
    async fn active_purchase_ids(&mut self, client_id: Uuid) -> StoreResult<Vec<Uuid>>;

    async fn insert_client(&mut self, client: &Client) -> StoreResult<()>;

    async fn update_client(&mut self, client: &Client) -> StoreResult<()>;

    async fn insert_purchase(&mut self, purchase: &Purchase) -> StoreResult<()>;

    async fn update_purchase(&mut self, purchase: &Purchase) -> StoreResult<()>;

    async fn insert_payment(&mut self, payment: &Payment) -> StoreResult<()>;

    async fn update_payment(&mut self, payment: &Payment) -> StoreResult<()>;

    /// Deactivate every active payment of a purchase, returning how many flipped
    async fn deactivate_payments_of(
        &mut self,
        purchase_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<u64>;

    /// Make every write of this unit visible
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps_negative() {
        let page = PageRequest::new(-5, -1);
        assert_eq!(page, PageRequest { limit: 0, offset: 0 });
    }

    #[test]
    fn test_page_request_slice() {
        let page = PageRequest::new(2, 1);
        assert_eq!(page.slice(vec![1, 2, 3, 4]), vec![2, 3]);

        let past_end = PageRequest::new(10, 10);
        assert!(past_end.slice(vec![1, 2, 3]).is_empty());
    }
}
