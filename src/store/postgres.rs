//! PostgreSQL record store
//!
//! Rows are read with `FOR UPDATE` inside a transaction, so concurrent
//! mutations of the same purchase serialize on the row lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Amount, Money};
use crate::model::{Client, Payment, Purchase, PurchaseStatus};

use super::{
    ClientFilter, LedgerStore, LedgerTx, PageRequest, PaymentFilter, PurchaseFilter, StoreError,
    StoreResult,
};

// =========================================================================
// Row mapping
// =========================================================================

#[derive(Debug, FromRow)]
struct ClientRow {
    id: Uuid,
    name: String,
    nickname: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Client {
            id: row.id,
            name: row.name,
            nickname: row.nickname,
            phone: row.phone,
            email: row.email,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PurchaseRow {
    id: Uuid,
    client_id: Uuid,
    description: String,
    total_value: Decimal,
    total_paid_value: Decimal,
    status: String,
    note_number: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PurchaseRow> for Purchase {
    type Error = StoreError;

    fn try_from(row: PurchaseRow) -> Result<Self, Self::Error> {
        let corrupt = |what: String| StoreError::Corrupt(format!("purchase {}: {}", row.id, what));

        Ok(Purchase {
            id: row.id,
            client_id: row.client_id,
            description: row.description.clone(),
            total_value: Amount::new(row.total_value).map_err(|e| corrupt(e.to_string()))?,
            total_paid_value: Money::new(row.total_paid_value).map_err(|e| corrupt(e.to_string()))?,
            status: row.status.parse::<PurchaseStatus>().map_err(corrupt)?,
            note_number: row.note_number.clone(),
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: Uuid,
    purchase_id: Uuid,
    amount: Decimal,
    payment_date: Option<DateTime<Utc>>,
    method: String,
    description: Option<String>,
    receipt_number: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let amount = Amount::new(row.amount)
            .map_err(|e| StoreError::Corrupt(format!("payment {}: {}", row.id, e)))?;

        Ok(Payment {
            id: row.id,
            purchase_id: row.purchase_id,
            amount,
            payment_date: row.payment_date,
            method: row.method,
            description: row.description,
            receipt_number: row.receipt_number,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn purchases(rows: Vec<PurchaseRow>) -> StoreResult<Vec<Purchase>> {
    rows.into_iter().map(Purchase::try_from).collect()
}

fn payments(rows: Vec<PaymentRow>) -> StoreResult<Vec<Payment>> {
    rows.into_iter().map(Payment::try_from).collect()
}

// =========================================================================
// Store
// =========================================================================

/// Record store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new PgStore with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn get_client(&self, id: Uuid) -> StoreResult<Option<Client>> {
        let row: Option<ClientRow> = sqlx::query_as(
            r#"
            SELECT id, name, nickname, phone, email, is_active, created_at, updated_at
            FROM clients
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Client::from))
    }

    async fn list_clients(&self, filter: ClientFilter, page: PageRequest) -> StoreResult<Vec<Client>> {
        let rows: Vec<ClientRow> = sqlx::query_as(
            r#"
            SELECT id, name, nickname, phone, email, is_active, created_at, updated_at
            FROM clients
            WHERE ($1 OR is_active)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(filter.include_inactive)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Client::from).collect())
    }

    async fn get_purchase(&self, id: Uuid) -> StoreResult<Option<Purchase>> {
        let row: Option<PurchaseRow> = sqlx::query_as(
            r#"
            SELECT id, client_id, description, total_value, total_paid_value, status,
                   note_number, is_active, created_at, updated_at
            FROM purchases
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Purchase::try_from).transpose()
    }

    async fn find_purchase_by_note_number(&self, note_number: &str) -> StoreResult<Option<Purchase>> {
        let row: Option<PurchaseRow> = sqlx::query_as(
            r#"
            SELECT id, client_id, description, total_value, total_paid_value, status,
                   note_number, is_active, created_at, updated_at
            FROM purchases
            WHERE note_number = $1
            "#,
        )
        .bind(note_number)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Purchase::try_from).transpose()
    }

    async fn list_purchases(
        &self,
        filter: PurchaseFilter,
        page: PageRequest,
    ) -> StoreResult<Vec<Purchase>> {
        let rows: Vec<PurchaseRow> = sqlx::query_as(
            r#"
            SELECT id, client_id, description, total_value, total_paid_value, status,
                   note_number, is_active, created_at, updated_at
            FROM purchases
            WHERE ($1::uuid IS NULL OR client_id = $1)
              AND ($2 OR is_active)
              AND (NOT $3 OR status IN ('pending', 'partial'))
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.client_id)
        .bind(filter.include_inactive)
        .bind(filter.outstanding_only)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        purchases(rows)
    }

    async fn get_payment(&self, id: Uuid) -> StoreResult<Option<Payment>> {
        let row: Option<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, purchase_id, amount, payment_date, method, description,
                   receipt_number, is_active, created_at, updated_at
            FROM payments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Payment::try_from).transpose()
    }

    async fn list_payments(
        &self,
        filter: PaymentFilter,
        page: PageRequest,
    ) -> StoreResult<Vec<Payment>> {
        let rows: Vec<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, purchase_id, amount, payment_date, method, description,
                   receipt_number, is_active, created_at, updated_at
            FROM payments
            WHERE ($1::uuid IS NULL OR purchase_id = $1)
              AND ($2 OR is_active)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.purchase_id)
        .bind(filter.include_inactive)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        payments(rows)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// =========================================================================
// Transaction
// =========================================================================

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgTx {
    async fn get_client(&mut self, id: Uuid) -> StoreResult<Option<Client>> {
        let row: Option<ClientRow> = sqlx::query_as(
            r#"
            SELECT id, name, nickname, phone, email, is_active, created_at, updated_at
            FROM clients
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Client::from))
    }

    async fn get_purchase(&mut self, id: Uuid) -> StoreResult<Option<Purchase>> {
        let row: Option<PurchaseRow> = sqlx::query_as(
            r#"
            SELECT id, client_id, description, total_value, total_paid_value, status,
                   note_number, is_active, created_at, updated_at
            FROM purchases
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Purchase::try_from).transpose()
    }

    async fn get_payment(&mut self, id: Uuid) -> StoreResult<Option<Payment>> {
        let row: Option<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, purchase_id, amount, payment_date, method, description,
                   receipt_number, is_active, created_at, updated_at
            FROM payments
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Payment::try_from).transpose()
    }

    async fn active_payments(&mut self, purchase_id: Uuid) -> StoreResult<Vec<Payment>> {
        let rows: Vec<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, purchase_id, amount, payment_date, method, description,
                   receipt_number, is_active, created_at, updated_at
            FROM payments
            WHERE purchase_id = $1 AND is_active
            ORDER BY created_at DESC
            FOR UPDATE
            "#,
        )
        .bind(purchase_id)
        .fetch_all(&mut *self.tx)
        .await?;

        payments(rows)
    }

    async fn active_purchase_ids(&mut self, client_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM purchases
            WHERE client_id = $1 AND is_active
            ORDER BY created_at DESC
            FOR UPDATE
            "#,
        )
        .bind(client_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(ids)
    }

    async fn insert_client(&mut self, client: &Client) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO clients (id, name, nickname, phone, email, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(client.id)
        .bind(&client.name)
        .bind(&client.nickname)
        .bind(&client.phone)
        .bind(&client.email)
        .bind(client.is_active)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn update_client(&mut self, client: &Client) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE clients
            SET name = $2, nickname = $3, phone = $4, email = $5, is_active = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(client.id)
        .bind(&client.name)
        .bind(&client.nickname)
        .bind(&client.phone)
        .bind(&client.email)
        .bind(client.is_active)
        .bind(client.updated_at)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound);
        }
        Ok(())
    }

    async fn insert_purchase(&mut self, purchase: &Purchase) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, client_id, description, total_value, total_paid_value, status,
                note_number, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(purchase.id)
        .bind(purchase.client_id)
        .bind(&purchase.description)
        .bind(purchase.total_value.value())
        .bind(purchase.total_paid_value.value())
        .bind(purchase.status.as_str())
        .bind(&purchase.note_number)
        .bind(purchase.is_active)
        .bind(purchase.created_at)
        .bind(purchase.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn update_purchase(&mut self, purchase: &Purchase) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE purchases
            SET client_id = $2, description = $3, total_value = $4, total_paid_value = $5,
                status = $6, is_active = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(purchase.id)
        .bind(purchase.client_id)
        .bind(&purchase.description)
        .bind(purchase.total_value.value())
        .bind(purchase.total_paid_value.value())
        .bind(purchase.status.as_str())
        .bind(purchase.is_active)
        .bind(purchase.updated_at)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound);
        }
        Ok(())
    }

    async fn insert_payment(&mut self, payment: &Payment) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, purchase_id, amount, payment_date, method, description,
                receipt_number, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(payment.id)
        .bind(payment.purchase_id)
        .bind(payment.amount.value())
        .bind(payment.payment_date)
        .bind(&payment.method)
        .bind(&payment.description)
        .bind(&payment.receipt_number)
        .bind(payment.is_active)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn update_payment(&mut self, payment: &Payment) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET amount = $2, payment_date = $3, method = $4, description = $5,
                is_active = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(payment.id)
        .bind(payment.amount.value())
        .bind(payment.payment_date)
        .bind(&payment.method)
        .bind(&payment.description)
        .bind(payment.is_active)
        .bind(payment.updated_at)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound);
        }
        Ok(())
    }

    async fn deactivate_payments_of(
        &mut self,
        purchase_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET is_active = FALSE, updated_at = $2
            WHERE purchase_id = $1 AND is_active
            "#,
        )
        .bind(purchase_id)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let PgTx { tx } = *self;
        tx.commit().await?;
        Ok(())
    }
}
