//! SQLite event mirror

use crate::{AttemptId, EventRecord, StorageError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{info, warn};

const CREATE_EVENTS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS cheating_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        attempt_id INTEGER NOT NULL,
        event_type TEXT NOT NULL,
        weight INTEGER NOT NULL,
        created_at TEXT NOT NULL
    )";

/// Durable copy of the event log
#[derive(Clone)]
pub struct SqliteEventLog {
    pool: SqlitePool,
}

impl SqliteEventLog {
    /// Connect (creating the database file if needed) and ensure the schema exists
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        info!("Connecting SQLite event mirror at {}", url);

        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let mut pool_options = SqlitePoolOptions::new().max_connections(4);
        if url.contains(":memory:") {
            // Each connection is its own in-memory database; keep exactly one alive
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;

        sqlx::query(CREATE_EVENTS_TABLE).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Insert one event
    pub async fn insert(&self, record: &EventRecord) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO cheating_events (attempt_id, event_type, weight, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(record.attempt_id)
        .bind(&record.kind)
        .bind(i64::from(record.weight))
        .bind(record.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert in the background; failures are only logged
    pub fn spawn_insert(&self, record: EventRecord) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(attempt_id = record.attempt_id, "No async runtime, event not mirrored");
            return;
        };

        let log = self.clone();
        handle.spawn(async move {
            if let Err(e) = log.insert(&record).await {
                warn!(
                    attempt_id = record.attempt_id,
                    kind = %record.kind,
                    "Event mirror insert failed: {}", e
                );
            }
        });
    }

    /// Number of mirrored events for an attempt
    pub async fn count_for(&self, attempt_id: AttemptId) -> Result<i64, StorageError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM cheating_events WHERE attempt_id = ?",
        )
        .bind(attempt_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
