//! Database module
//!
//! Connection pool, schema checks and schema setup.

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, StoreBackend};
use crate::store::{MemoryStore, PgStore, SharedStore};

/// Schema shipped with the crate
const SCHEMA: &str = include_str!("../migrations/0001_ledger.sql");

/// Tables the ledger cannot run without
const REQUIRED_TABLES: &[&str] = &["clients", "purchases", "payments"];

/// Open a connection pool
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// Simple connectivity check
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Create the ledger tables if they do not exist yet
pub async fn apply_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    pool.execute(SCHEMA).await?;
    tracing::info!("Ledger schema applied");
    Ok(())
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    for table in REQUIRED_TABLES {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = current_schema() AND table_name = $1
            )
            "#,
        )
        .bind(*table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    Ok(true)
}

/// Open the record store selected by the configuration.
///
/// For Postgres the pool is returned too so the caller can close it on
/// shutdown. The schema is applied first when `auto_migrate` is set.
pub async fn open_store(config: &Config) -> anyhow::Result<(SharedStore, Option<PgPool>)> {
    match config.store {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store, data is lost on exit");
            let store: SharedStore = Arc::new(MemoryStore::new());
            Ok((store, None))
        }
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for the postgres store"))?;

            tracing::info!("Connecting to database...");
            let pool = connect(url, config.database_max_connections).await?;
            verify_connection(&pool).await?;

            if config.auto_migrate {
                apply_schema(&pool).await?;
            }

            if !check_schema(&pool).await? {
                tracing::error!("Database schema is not complete. Please run migrations.");
                return Err(anyhow::anyhow!("Database schema incomplete"));
            }

            tracing::info!("Database connected successfully");
            let store: SharedStore = Arc::new(PgStore::new(pool.clone()));
            Ok((store, Some(pool)))
        }
    }
}
