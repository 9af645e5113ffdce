//! SQLite-backed edge sink.
//!
//! Each flushed batch is written in a single transaction, one row per event
//! record, tagged with a batch id (UUID v7) and the record's position in the
//! batch. Uses a single-connection pool in WAL mode: the sink only writes.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use uuid::Uuid;

use edgebus_core::DeliverySink;
use edgebus_types::error::DeliveryError;
use edgebus_types::event::EventRecord;

/// An event as stored by [`SqliteSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    pub batch_id: Uuid,
    pub seq: i64,
    pub record: EventRecord,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SqliteSink {
    pool: SqlitePool,
}

impl SqliteSink {
    /// Connect to `database_url`, creating the file if needed, and run
    /// migrations.
    pub async fn open(database_url: &str) -> Result<Self, DeliveryError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(storage_error)?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(storage_error)?;

        sqlx::migrate!("../../migrations")
            .run(&pool)
            .await
            .map_err(|e| DeliveryError::Storage(format!("migration failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Open the database file at `path`, creating parent directories.
    pub async fn open_path(path: &Path) -> Result<Self, DeliveryError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DeliveryError::Storage(format!("failed to create {}: {e}", parent.display())))?;
        }
        Self::open(&format!("sqlite://{}?mode=rwc", path.display())).await
    }

    /// Total number of stored events.
    pub async fn count(&self) -> Result<i64, DeliveryError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(row.0)
    }

    /// The most recent `limit` events, oldest first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<StoredEvent>, DeliveryError> {
        let rows = sqlx::query(
            "SELECT batch_id, seq, event_type, data, received_at FROM (
                 SELECT rowid, batch_id, seq, event_type, data, received_at
                 FROM events ORDER BY rowid DESC LIMIT ?
             ) ORDER BY rowid ASC",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter()
            .map(|row| EventRow::from_row(row).map_err(storage_error)?.into_stored())
            .collect()
    }
}

impl DeliverySink for SqliteSink {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn deliver(&self, batch: Vec<EventRecord>) -> BoxFuture<'static, Result<(), DeliveryError>> {
        let pool = self.pool.clone();
        async move {
            let batch_id = Uuid::now_v7().to_string();
            let received_at = format_datetime(&Utc::now());

            let mut tx = pool.begin().await.map_err(storage_error)?;
            for (seq, record) in batch.iter().enumerate() {
                let data = serde_json::to_string(record.data())?;
                sqlx::query(
                    "INSERT INTO events (id, batch_id, seq, event_type, data, received_at)
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(Uuid::now_v7().to_string())
                .bind(&batch_id)
                .bind(seq as i64)
                .bind(record.event_type())
                .bind(data)
                .bind(&received_at)
                .execute(&mut *tx)
                .await
                .map_err(storage_error)?;
            }
            tx.commit().await.map_err(storage_error)?;

            tracing::debug!(batch_id = %batch_id, count = batch.len(), "batch stored");
            Ok(())
        }
        .boxed()
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct EventRow {
    batch_id: String,
    seq: i64,
    event_type: String,
    data: String,
    received_at: String,
}

impl EventRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            batch_id: row.try_get("batch_id")?,
            seq: row.try_get("seq")?,
            event_type: row.try_get("event_type")?,
            data: row.try_get("data")?,
            received_at: row.try_get("received_at")?,
        })
    }

    fn into_stored(self) -> Result<StoredEvent, DeliveryError> {
        let batch_id = Uuid::parse_str(&self.batch_id)
            .map_err(|e| DeliveryError::Storage(format!("invalid batch_id: {e}")))?;
        let data: serde_json::Value = serde_json::from_str(&self.data)?;
        let received_at = DateTime::parse_from_rfc3339(&self.received_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| DeliveryError::Storage(format!("invalid datetime: {e}")))?;

        Ok(StoredEvent {
            batch_id,
            seq: self.seq,
            record: EventRecord::new(self.event_type, data),
            received_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn storage_error(e: sqlx::Error) -> DeliveryError {
    DeliveryError::Storage(e.to_string())
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}
