//! In-memory record store
//!
//! Used by tests, the seed tool and `STORE=memory` deployments. Writers are
//! serialized by a single lock; each transaction works on a private copy of
//! the tables that replaces the shared copy on commit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use crate::model::{Client, Entity, Payment, Purchase};

use super::{
    constraints, ClientFilter, LedgerStore, LedgerTx, PageRequest, PaymentFilter, PurchaseFilter,
    StoreError, StoreResult,
};

// =========================================================================
// Tables
// =========================================================================

#[derive(Debug, Clone)]
struct Row<T> {
    /// Insertion order, breaks ties between equal timestamps
    seq: u64,
    entity: T,
}

#[derive(Debug, Clone)]
struct Table<T> {
    rows: HashMap<Uuid, Row<T>>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }
}

impl<T: Entity> Table<T> {
    fn get(&self, id: Uuid) -> Option<T> {
        self.rows.get(&id).map(|row| row.entity.clone())
    }

    fn contains(&self, id: Uuid) -> bool {
        self.rows.contains_key(&id)
    }

    fn insert(&mut self, seq: u64, entity: T) {
        self.rows.insert(entity.id(), Row { seq, entity });
    }

    fn replace(&mut self, entity: T) -> StoreResult<()> {
        let row = self.rows.get_mut(&entity.id()).ok_or(StoreError::RowNotFound)?;
        row.entity = entity;
        Ok(())
    }

    /// Whether another row already holds `key` in the unique column
    fn is_taken<F>(&self, id: Uuid, key: Option<&str>, column: F) -> bool
    where
        F: Fn(&T) -> Option<&str>,
    {
        let Some(key) = key else {
            return false;
        };
        self.rows
            .values()
            .any(|row| row.entity.id() != id && column(&row.entity) == Some(key))
    }

    /// Matching rows, newest first
    fn select<F>(&self, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        let mut rows: Vec<&Row<T>> = self.rows.values().filter(|row| predicate(&row.entity)).collect();
        rows.sort_by(|a, b| {
            b.entity
                .created_at()
                .cmp(&a.entity.created_at())
                .then(b.seq.cmp(&a.seq))
        });
        rows.into_iter().map(|row| row.entity.clone()).collect()
    }
}

#[derive(Debug, Clone, Default)]
struct Tables {
    clients: Table<Client>,
    purchases: Table<Purchase>,
    payments: Table<Payment>,
}

// =========================================================================
// Store
// =========================================================================

/// Record store kept entirely in process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    writer: Arc<Mutex<()>>,
    seq: Arc<AtomicU64>,
    fail_purchase_updates: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent purchase update fail, to exercise rollback paths
    #[cfg(test)]
    pub(crate) fn fail_purchase_updates(&self, fail: bool) {
        self.fail_purchase_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>> {
        let guard = self.writer.clone().lock_owned().await;
        let tables = self.tables.read().await.clone();

        Ok(Box::new(MemoryTx {
            _guard: guard,
            tables,
            shared: self.tables.clone(),
            seq: self.seq.clone(),
            fail_purchase_updates: self.fail_purchase_updates.load(Ordering::SeqCst),
        }))
    }

    async fn get_client(&self, id: Uuid) -> StoreResult<Option<Client>> {
        Ok(self.tables.read().await.clients.get(id))
    }

    async fn list_clients(&self, filter: ClientFilter, page: PageRequest) -> StoreResult<Vec<Client>> {
        let tables = self.tables.read().await;
        let clients = tables
            .clients
            .select(|client| filter.include_inactive || client.is_active);
        Ok(page.slice(clients))
    }

    async fn get_purchase(&self, id: Uuid) -> StoreResult<Option<Purchase>> {
        Ok(self.tables.read().await.purchases.get(id))
    }

    async fn find_purchase_by_note_number(&self, note_number: &str) -> StoreResult<Option<Purchase>> {
        let tables = self.tables.read().await;
        Ok(tables
            .purchases
            .select(|purchase| purchase.note_number() == Some(note_number))
            .into_iter()
            .next())
    }

    async fn list_purchases(
        &self,
        filter: PurchaseFilter,
        page: PageRequest,
    ) -> StoreResult<Vec<Purchase>> {
        let tables = self.tables.read().await;
        Ok(page.slice(tables.purchases.select(|purchase| filter.matches(purchase))))
    }

    async fn get_payment(&self, id: Uuid) -> StoreResult<Option<Payment>> {
        Ok(self.tables.read().await.payments.get(id))
    }

    async fn list_payments(
        &self,
        filter: PaymentFilter,
        page: PageRequest,
    ) -> StoreResult<Vec<Payment>> {
        let tables = self.tables.read().await;
        Ok(page.slice(tables.payments.select(|payment| filter.matches(payment))))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

// =========================================================================
// Transaction
// =========================================================================

struct MemoryTx {
    /// Held until commit or drop
    _guard: OwnedMutexGuard<()>,
    tables: Tables,
    shared: Arc<RwLock<Tables>>,
    seq: Arc<AtomicU64>,
    fail_purchase_updates: bool,
}

impl MemoryTx {
    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn get_client(&mut self, id: Uuid) -> StoreResult<Option<Client>> {
        Ok(self.tables.clients.get(id))
    }

    async fn get_purchase(&mut self, id: Uuid) -> StoreResult<Option<Purchase>> {
        Ok(self.tables.purchases.get(id))
    }

    async fn get_payment(&mut self, id: Uuid) -> StoreResult<Option<Payment>> {
        Ok(self.tables.payments.get(id))
    }

    async fn active_payments(&mut self, purchase_id: Uuid) -> StoreResult<Vec<Payment>> {
        Ok(self
            .tables
            .payments
            .select(|payment| payment.is_active && payment.purchase_id == purchase_id))
    }

    async fn active_purchase_ids(&mut self, client_id: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(self
            .tables
            .purchases
            .select(|purchase| purchase.is_active && purchase.client_id == client_id)
            .iter()
            .map(|purchase| purchase.id)
            .collect())
    }

    async fn insert_client(&mut self, client: &Client) -> StoreResult<()> {
        if self
            .tables
            .clients
            .is_taken(client.id, client.nickname(), Client::nickname)
        {
            return Err(StoreError::unique(constraints::CLIENT_NICKNAME));
        }
        let seq = self.next_seq();
        self.tables.clients.insert(seq, client.clone());
        Ok(())
    }

    async fn update_client(&mut self, client: &Client) -> StoreResult<()> {
        if self
            .tables
            .clients
            .is_taken(client.id, client.nickname(), Client::nickname)
        {
            return Err(StoreError::unique(constraints::CLIENT_NICKNAME));
        }
        self.tables.clients.replace(client.clone())
    }

    async fn insert_purchase(&mut self, purchase: &Purchase) -> StoreResult<()> {
        if !self.tables.clients.contains(purchase.client_id) {
            return Err(StoreError::foreign_key(constraints::PURCHASE_CLIENT));
        }
        if self
            .tables
            .purchases
            .is_taken(purchase.id, purchase.note_number(), Purchase::note_number)
        {
            return Err(StoreError::unique(constraints::PURCHASE_NOTE_NUMBER));
        }
        let seq = self.next_seq();
        self.tables.purchases.insert(seq, purchase.clone());
        Ok(())
    }

    async fn update_purchase(&mut self, purchase: &Purchase) -> StoreResult<()> {
        if self.fail_purchase_updates {
            return Err(StoreError::Database(sqlx::Error::Protocol(
                "injected purchase update failure".to_string(),
            )));
        }
        if !self.tables.clients.contains(purchase.client_id) {
            return Err(StoreError::foreign_key(constraints::PURCHASE_CLIENT));
        }
        self.tables.purchases.replace(purchase.clone())
    }

    async fn insert_payment(&mut self, payment: &Payment) -> StoreResult<()> {
        if !self.tables.purchases.contains(payment.purchase_id) {
            return Err(StoreError::foreign_key(constraints::PAYMENT_PURCHASE));
        }
        if self
            .tables
            .payments
            .is_taken(payment.id, payment.receipt_number(), Payment::receipt_number)
        {
            return Err(StoreError::unique(constraints::PAYMENT_RECEIPT_NUMBER));
        }
        let seq = self.next_seq();
        self.tables.payments.insert(seq, payment.clone());
        Ok(())
    }

    async fn update_payment(&mut self, payment: &Payment) -> StoreResult<()> {
        self.tables.payments.replace(payment.clone())
    }

    async fn deactivate_payments_of(
        &mut self,
        purchase_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut count = 0;
        for row in self.tables.payments.rows.values_mut() {
            if row.entity.purchase_id == purchase_id && row.entity.set_active(false, now) {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx { _guard, tables, shared, .. } = *self;
        *shared.write().await = tables;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Amount;
    use crate::model::PaymentDraft;
    use chrono::Duration;

    fn client(nickname: &str) -> Client {
        Client::create(Uuid::new_v4(), "Test", Some(nickname), None, None, Utc::now()).unwrap()
    }

    fn purchase(client_id: Uuid, note: &str) -> Purchase {
        Purchase::create(
            Uuid::new_v4(),
            client_id,
            "Item",
            Amount::from_integer(100).unwrap(),
            Some(note.to_string()),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_commit_makes_writes_visible() {
        let store = MemoryStore::new();
        let client = client("ana");

        let mut tx = store.begin().await.unwrap();
        tx.insert_client(&client).await.unwrap();
        assert!(store.get_client(client.id).await.unwrap().is_none());
        tx.commit().await.unwrap();

        assert_eq!(store.get_client(client.id).await.unwrap(), Some(client));
    }

    #[tokio::test]
    async fn test_drop_discards_writes() {
        let store = MemoryStore::new();
        let client = client("ana");

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_client(&client).await.unwrap();
        }

        assert!(store.get_client(client.id).await.unwrap().is_none());
        // Writer lock was released by the drop
        let tx = store.begin().await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_unique_and_foreign_keys() {
        let store = MemoryStore::new();
        let ana = client("ana");
        let mut tx = store.begin().await.unwrap();
        tx.insert_client(&ana).await.unwrap();

        let dup = tx.insert_client(&client("ana")).await;
        assert!(matches!(dup, Err(StoreError::UniqueViolation { ref constraint }) if constraint == constraints::CLIENT_NICKNAME));

        let orphan = tx.insert_purchase(&purchase(Uuid::new_v4(), "NF-1")).await;
        assert!(matches!(orphan, Err(StoreError::ForeignKeyViolation { .. })));

        tx.insert_purchase(&purchase(ana.id, "NF-1")).await.unwrap();
        let dup_note = tx.insert_purchase(&purchase(ana.id, "NF-1")).await;
        assert!(matches!(dup_note, Err(StoreError::UniqueViolation { ref constraint }) if constraint == constraints::PURCHASE_NOTE_NUMBER));
    }

    #[tokio::test]
    async fn test_lists_newest_first_with_window() {
        let store = MemoryStore::new();
        let base = Utc::now();
        let mut tx = store.begin().await.unwrap();

        let mut ids = Vec::new();
        for (i, nick) in ["a", "b", "c"].iter().enumerate() {
            let mut c = client(nick);
            c.created_at = base + Duration::seconds(i as i64);
            ids.push(c.id);
            tx.insert_client(&c).await.unwrap();
        }
        tx.commit().await.unwrap();

        let page = store
            .list_clients(ClientFilter::default(), PageRequest::new(2, 0))
            .await
            .unwrap();
        assert_eq!(page.iter().map(|c| c.id).collect::<Vec<_>>(), vec![ids[2], ids[1]]);

        let rest = store
            .list_clients(ClientFilter::default(), PageRequest::new(2, 2))
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, ids[0]);
    }

    #[tokio::test]
    async fn test_deactivate_payments_of() {
        let store = MemoryStore::new();
        let ana = client("ana");
        let p = purchase(ana.id, "NF-1");
        let mut tx = store.begin().await.unwrap();
        tx.insert_client(&ana).await.unwrap();
        tx.insert_purchase(&p).await.unwrap();
        for _ in 0..2 {
            let payment = Payment::create(
                Uuid::new_v4(),
                p.id,
                PaymentDraft::new(Amount::from_integer(10).unwrap(), "Cash"),
                Utc::now(),
            );
            tx.insert_payment(&payment).await.unwrap();
        }

        assert_eq!(tx.deactivate_payments_of(p.id, Utc::now()).await.unwrap(), 2);
        assert_eq!(tx.deactivate_payments_of(p.id, Utc::now()).await.unwrap(), 0);
        assert!(tx.active_payments(p.id).await.unwrap().is_empty());
    }
}
