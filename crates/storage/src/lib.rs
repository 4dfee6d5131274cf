//! Storage Layer
//!
//! Event log, attempt scoring, and reference embeddings for exam attempts.
//! The in-memory [`Repository`] implements all three contracts; events can be
//! mirrored to SQLite for durability.

mod repository;
mod scoring;
mod sqlite;

pub use repository::{EventRecord, Repository};
pub use scoring::{AttemptEvaluation, ScoringConfig, STATUS_TERMINATED, WARNING_FINAL};
pub use sqlite::SqliteEventLog;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Exam attempt identifier
pub type AttemptId = i64;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Record not found")]
    NotFound,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Append-only log of cheating events
pub trait EventLog: Send + Sync {
    /// Record an event of `kind` for the attempt and return the stored record
    fn log_event(&self, attempt_id: AttemptId, kind: &str) -> Result<EventRecord, StorageError>;
}

/// Attempt scoring engine
pub trait AttemptScoring: Send + Sync {
    /// Current status, warning, and score of the attempt
    fn evaluate_attempt(&self, attempt_id: AttemptId) -> Result<AttemptEvaluation, StorageError>;

    /// Mark the attempt terminal
    fn terminate_attempt(&self, attempt_id: AttemptId) -> Result<(), StorageError>;
}

/// Enrolled reference embeddings, one per attempt
pub trait ReferenceEmbeddings: Send + Sync {
    fn reference_embedding(&self, attempt_id: AttemptId) -> Result<Option<Vec<f32>>, StorageError>;

    fn save_reference_embedding(
        &self,
        attempt_id: AttemptId,
        embedding: Vec<f32>,
    ) -> Result<(), StorageError>;
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite URL for the event mirror (e.g. `sqlite://proctor.db`)
    pub sqlite_url: Option<String>,
    /// Max in-memory event records
    pub max_event_records: usize,
    /// Event weights and score thresholds
    pub scoring: ScoringConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_url: None,
            max_event_records: 100_000,
            scoring: ScoringConfig::default(),
        }
    }
}
