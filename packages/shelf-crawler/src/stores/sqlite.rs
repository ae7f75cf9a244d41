//! SQLite storage implementation.
//!
//! A file-based batch store using SQLite. Good for:
//! - Local development against a throwaway database
//! - Testing the persister with real transactions

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;

use crate::error::{StoreError, StoreResult};
use crate::traits::store::{
    BatchStore, INSERT_BATCH, INSERT_KEY_VALUE, SCHEMA, SELECT_BATCH_VALUES, SELECT_LATEST_BATCH,
    UPDATE_BATCH_STATUS,
};
use crate::types::batch::{parse_timestamp, Batch, BatchStatus, KeyValueRow};

fn db(e: sqlx::Error) -> StoreError {
    StoreError::Database(Box::new(e))
}

/// SQLite-based batch store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store with the given connection URL.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - In-memory database (ephemeral)
    /// - `sqlite:shelf.db` - File-based database, created if missing
    pub async fn new(database_url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(db)?
            .create_if_missing(true);

        // every pooled connection to :memory: would get its own database
        let mut pool_options = SqlitePoolOptions::new().max_connections(5);
        if database_url.contains(":memory:") {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(db)?;

        Ok(Self { pool })
    }

    /// Create an in-memory SQLite store with the schema applied (for testing).
    pub async fn in_memory() -> StoreResult<Self> {
        let store = Self::new("sqlite::memory:").await?;
        store.ensure_schema().await?;
        Ok(store)
    }
}

#[derive(Debug, FromRow)]
struct BatchRow {
    id: i64,
    batch_type: String,
    status: String,
    details: Option<String>,
    created_at: String,
    updated_at: String,
}

impl BatchRow {
    fn into_batch(self) -> StoreResult<Batch> {
        let details = self
            .details
            .map(|d| serde_json::from_str(&d))
            .transpose()
            .map_err(|e| StoreError::Protocol(format!("Invalid details JSON: {e}")))?;

        Ok(Batch {
            id: self.id,
            batch_type: self.batch_type,
            status: self.status.parse()?,
            details,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

#[async_trait]
impl BatchStore for SqliteStore {
    async fn ensure_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db)?;
        }
        Ok(())
    }

    async fn open_batch(&self, batch_type: &str) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>(INSERT_BATCH)
            .bind(batch_type)
            .bind(BatchStatus::Pending.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(db)
    }

    async fn write_chunk(&self, rows: &[KeyValueRow]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db)?;
        for row in rows {
            sqlx::query(INSERT_KEY_VALUE)
                .bind(&row.batch_type)
                .bind(row.batch_id)
                .bind(&row.key)
                .bind(&row.value)
                .execute(&mut *tx)
                .await
                .map_err(db)?;
        }
        tx.commit().await.map_err(db)
    }

    async fn set_batch_status(&self, batch_id: i64, status: BatchStatus) -> StoreResult<()> {
        let result = sqlx::query(UPDATE_BATCH_STATUS)
            .bind(status.as_str())
            .bind(batch_id)
            .execute(&self.pool)
            .await
            .map_err(db)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::BatchNotFound(batch_id));
        }
        Ok(())
    }

    async fn latest_batch(
        &self,
        batch_type: &str,
        status: BatchStatus,
    ) -> StoreResult<Option<Batch>> {
        let row: Option<BatchRow> = sqlx::query_as(SELECT_LATEST_BATCH)
            .bind(batch_type)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;

        row.map(BatchRow::into_batch).transpose()
    }

    async fn batch_values(&self, batch_id: i64) -> StoreResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(SELECT_BATCH_VALUES)
            .bind(batch_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db)
    }
}
