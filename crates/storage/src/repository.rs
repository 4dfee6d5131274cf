//! Repository Implementation

use crate::{
    AttemptEvaluation, AttemptId, AttemptScoring, EventLog, ReferenceEmbeddings, ScoringConfig,
    SqliteEventLog, StorageConfig, StorageError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use tracing::{debug, info};

/// Cheating event record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: i64,
    pub attempt_id: AttemptId,
    pub kind: String,
    pub weight: u32,
    pub timestamp: DateTime<Utc>,
}

/// Per-attempt scoring state
#[derive(Debug, Clone, Default)]
struct AttemptRecord {
    cheating_score: u32,
    terminated_at: Option<DateTime<Utc>>,
}

/// Repository for events, attempts, and reference embeddings (in-memory,
/// optionally mirroring events to SQLite)
pub struct Repository {
    /// Event records (in-memory)
    events: Mutex<VecDeque<EventRecord>>,
    /// Scoring state by attempt
    attempts: Mutex<HashMap<AttemptId, AttemptRecord>>,
    /// Enrolled reference embeddings by attempt
    references: Mutex<HashMap<AttemptId, Vec<f32>>>,
    /// Max event records kept in memory
    max_event_records: usize,
    /// Next event ID
    next_event_id: AtomicI64,
    /// Event weights and thresholds
    scoring: ScoringConfig,
    /// Durable event mirror
    mirror: Option<SqliteEventLog>,
}

fn lock_error<T>(e: std::sync::PoisonError<T>) -> StorageError {
    StorageError::DatabaseError(format!("Lock error: {}", e))
}

impl Repository {
    /// Create a new in-memory repository
    pub fn new(scoring: ScoringConfig) -> Self {
        info!("Creating in-memory repository");
        Self {
            events: Mutex::new(VecDeque::with_capacity(1024)),
            attempts: Mutex::new(HashMap::new()),
            references: Mutex::new(HashMap::new()),
            max_event_records: 100_000,
            next_event_id: AtomicI64::new(1),
            scoring,
            mirror: None,
        }
    }

    /// Create a repository from configuration, connecting the SQLite mirror if set
    pub async fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let mut repo = Self::new(config.scoring.clone());
        repo.max_event_records = config.max_event_records.max(1);
        if let Some(url) = &config.sqlite_url {
            repo.mirror = Some(SqliteEventLog::connect(url).await?);
        }
        Ok(repo)
    }

    /// Events recorded for an attempt, oldest first
    pub fn events_for(&self, attempt_id: AttemptId) -> Result<Vec<EventRecord>, StorageError> {
        let events = self.events.lock().map_err(lock_error)?;
        Ok(events
            .iter()
            .filter(|e| e.attempt_id == attempt_id)
            .cloned()
            .collect())
    }

    /// Get total event count
    pub fn event_count(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Number of attempts with scoring state
    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().map(|a| a.len()).unwrap_or(0)
    }

    /// Clear all data (for testing)
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.clear();
        }
        if let Ok(mut refs) = self.references.lock() {
            refs.clear();
        }
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

impl EventLog for Repository {
    fn log_event(&self, attempt_id: AttemptId, kind: &str) -> Result<EventRecord, StorageError> {
        let record = EventRecord {
            id: self.next_event_id.fetch_add(1, Ordering::Relaxed),
            attempt_id,
            kind: kind.to_string(),
            weight: self.scoring.weight_of(kind),
            timestamp: Utc::now(),
        };

        {
            let mut events = self.events.lock().map_err(lock_error)?;
            // Enforce retention
            while events.len() >= self.max_event_records {
                events.pop_front();
            }
            events.push_back(record.clone());
        }

        {
            let mut attempts = self.attempts.lock().map_err(lock_error)?;
            let attempt = attempts.entry(attempt_id).or_default();
            attempt.cheating_score = attempt.cheating_score.saturating_add(record.weight);
        }

        if let Some(mirror) = &self.mirror {
            mirror.spawn_insert(record.clone());
        }

        debug!(attempt_id, kind, weight = record.weight, "Logged event {}", record.id);
        Ok(record)
    }
}

impl AttemptScoring for Repository {
    fn evaluate_attempt(&self, attempt_id: AttemptId) -> Result<AttemptEvaluation, StorageError> {
        let attempts = self.attempts.lock().map_err(lock_error)?;
        let (score, terminated) = attempts
            .get(&attempt_id)
            .map(|a| (a.cheating_score, a.terminated_at.is_some()))
            .unwrap_or((0, false));
        Ok(self.scoring.evaluate(score, terminated))
    }

    fn terminate_attempt(&self, attempt_id: AttemptId) -> Result<(), StorageError> {
        let mut attempts = self.attempts.lock().map_err(lock_error)?;
        let attempt = attempts.entry(attempt_id).or_default();
        if attempt.terminated_at.is_none() {
            attempt.terminated_at = Some(Utc::now());
            info!(attempt_id, "Attempt terminated");
        }
        Ok(())
    }
}

impl ReferenceEmbeddings for Repository {
    fn reference_embedding(&self, attempt_id: AttemptId) -> Result<Option<Vec<f32>>, StorageError> {
        let refs = self.references.lock().map_err(lock_error)?;
        Ok(refs.get(&attempt_id).cloned())
    }

    fn save_reference_embedding(
        &self,
        attempt_id: AttemptId,
        embedding: Vec<f32>,
    ) -> Result<(), StorageError> {
        let mut refs = self.references.lock().map_err(lock_error)?;
        refs.insert(attempt_id, embedding);
        info!(attempt_id, "Reference embedding saved");
        Ok(())
    }
}
