//! Remote libSQL storage.
//!
//! Wraps a remote `libsql::Connection` (Turso or `sqld`). Chunk writes run in
//! one transaction on that connection.

use async_trait::async_trait;
use libsql::{params, Builder, Connection, Value};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::security::credentials::StoreCredentials;
use crate::traits::store::{
    BatchStore, INSERT_BATCH, INSERT_KEY_VALUE, SCHEMA, SELECT_BATCH_VALUES, SELECT_LATEST_BATCH,
    UPDATE_BATCH_STATUS,
};
use crate::types::batch::{parse_timestamp, Batch, BatchStatus, KeyValueRow};

fn db(e: libsql::Error) -> StoreError {
    StoreError::Database(Box::new(e))
}

fn text(value: Value, column: &str) -> StoreResult<String> {
    match value {
        Value::Text(text) => Ok(text),
        other => Err(StoreError::Protocol(format!("{column} is not text: {other:?}"))),
    }
}

/// Build a [`Batch`] from the columns of `SELECT_LATEST_BATCH`, in order.
fn batch_from_values(values: Vec<Value>) -> StoreResult<Batch> {
    let [id, batch_type, status, details, created_at, updated_at]: [Value; 6] =
        values.try_into().map_err(|v: Vec<Value>| {
            StoreError::Protocol(format!("expected 6 batch columns, got {}", v.len()))
        })?;

    let Value::Integer(id) = id else {
        return Err(StoreError::Protocol(format!("batch id is not an integer: {id:?}")));
    };
    let details = match details {
        Value::Text(json) => Some(
            serde_json::from_str(&json)
                .map_err(|e| StoreError::Protocol(format!("Invalid details JSON: {e}")))?,
        ),
        _ => None,
    };

    Ok(Batch {
        id,
        batch_type: text(batch_type, "batch_type")?,
        status: text(status, "status")?.parse()?,
        details,
        created_at: parse_timestamp(&text(created_at, "created_at")?)?,
        updated_at: parse_timestamp(&text(updated_at, "updated_at")?)?,
    })
}

/// libSQL-based batch store.
pub struct LibsqlStore {
    conn: Connection,
}

impl LibsqlStore {
    /// Open a remote database.
    ///
    /// Accepts `libsql://`, `https://` and `http://` URLs. No request is made
    /// until the first statement runs.
    pub async fn new(credentials: &StoreCredentials) -> StoreResult<Self> {
        let token = credentials
            .auth_token
            .as_ref()
            .map(|t| t.expose().to_string())
            .unwrap_or_default();

        let database = Builder::new_remote(credentials.url.clone(), token)
            .build()
            .await
            .map_err(db)?;
        let conn = database.connect().map_err(db)?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl BatchStore for LibsqlStore {
    async fn ensure_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            self.conn.execute(statement, params![]).await.map_err(db)?;
        }
        Ok(())
    }

    async fn open_batch(&self, batch_type: &str) -> StoreResult<i64> {
        let mut rows = self
            .conn
            .query(INSERT_BATCH, params![batch_type, BatchStatus::Pending.as_str()])
            .await
            .map_err(db)?;

        let row = rows
            .next()
            .await
            .map_err(db)?
            .ok_or_else(|| StoreError::Protocol("insert returned no batch id".into()))?;
        row.get::<i64>(0).map_err(db)
    }

    async fn write_chunk(&self, rows: &[KeyValueRow]) -> StoreResult<()> {
        let tx = self.conn.transaction().await.map_err(db)?;
        for row in rows {
            tx.execute(
                INSERT_KEY_VALUE,
                params![
                    row.batch_type.as_str(),
                    row.batch_id,
                    row.key.as_str(),
                    row.value.as_str()
                ],
            )
            .await
            .map_err(db)?;
        }
        tx.commit().await.map_err(db)?;
        debug!(rows = rows.len(), "Committed chunk");
        Ok(())
    }

    async fn set_batch_status(&self, batch_id: i64, status: BatchStatus) -> StoreResult<()> {
        let affected = self
            .conn
            .execute(UPDATE_BATCH_STATUS, params![status.as_str(), batch_id])
            .await
            .map_err(db)?;

        if affected == 0 {
            return Err(StoreError::BatchNotFound(batch_id));
        }
        Ok(())
    }

    async fn latest_batch(
        &self,
        batch_type: &str,
        status: BatchStatus,
    ) -> StoreResult<Option<Batch>> {
        let mut rows = self
            .conn
            .query(SELECT_LATEST_BATCH, params![batch_type, status.as_str()])
            .await
            .map_err(db)?;

        let Some(row) = rows.next().await.map_err(db)? else {
            return Ok(None);
        };
        let values = (0..6)
            .map(|i| row.get_value(i))
            .collect::<Result<Vec<_>, _>>()
            .map_err(db)?;
        batch_from_values(values).map(Some)
    }

    async fn batch_values(&self, batch_id: i64) -> StoreResult<Vec<String>> {
        let mut rows = self
            .conn
            .query(SELECT_BATCH_VALUES, params![batch_id])
            .await
            .map_err(db)?;

        let mut values = Vec::new();
        while let Some(row) = rows.next().await.map_err(db)? {
            values.push(text(row.get_value(0).map_err(db)?, "value")?);
        }
        Ok(values)
    }
}
