//! Session tracker store
//!
//! One [`SessionTrackingRecord`] per attempt behind its own async mutex. The
//! map lock is only held to look up, insert, or sweep slots; frame processing
//! happens under the per-attempt lock, so attempts never wait on each other.

use metrics::gauge;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::state::SessionTrackingRecord;
use crate::AttemptId;

/// Exclusive handle on one attempt's record
pub type SharedRecord = Arc<tokio::sync::Mutex<SessionTrackingRecord>>;

struct SessionSlot {
    record: SharedRecord,
    last_access: Instant,
}

struct Sessions {
    slots: HashMap<AttemptId, SessionSlot>,
    last_sweep: Instant,
}

/// Keyed store of per-attempt tracking records with idle eviction
pub struct SessionRegistry {
    sessions: Mutex<Sessions>,
    idle_ttl: Duration,
    sweep_interval: Duration,
}

impl SessionRegistry {
    pub fn new(idle_ttl: Duration, sweep_interval: Duration) -> Self {
        info!(
            "Creating session registry (idle ttl {:?}, sweep every {:?})",
            idle_ttl, sweep_interval
        );
        Self {
            sessions: Mutex::new(Sessions {
                slots: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            idle_ttl,
            sweep_interval,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Sessions> {
        // Slots stay consistent even if a holder panicked
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record for the attempt, created on first use
    pub fn session(&self, attempt_id: AttemptId, now: Instant) -> SharedRecord {
        let mut sessions = self.lock();

        if now.saturating_duration_since(sessions.last_sweep) >= self.sweep_interval {
            self.sweep(&mut sessions, now);
        }

        let slot = sessions.slots.entry(attempt_id).or_insert_with(|| {
            debug!(attempt_id, "Tracking new attempt");
            SessionSlot {
                record: Arc::new(tokio::sync::Mutex::new(SessionTrackingRecord::new(
                    attempt_id, now,
                ))),
                last_access: now,
            }
        });
        if now > slot.last_access {
            slot.last_access = now;
        }
        let record = Arc::clone(&slot.record);

        gauge!("proctor_tracked_sessions").set(sessions.slots.len() as f64);
        record
    }

    /// Record for the attempt if it is tracked
    pub fn get(&self, attempt_id: AttemptId) -> Option<SharedRecord> {
        self.lock()
            .slots
            .get(&attempt_id)
            .map(|slot| Arc::clone(&slot.record))
    }

    /// Drop records idle longer than the ttl; returns how many were dropped
    pub fn evict_idle(&self, now: Instant) -> usize {
        let mut sessions = self.lock();
        self.sweep(&mut sessions, now)
    }

    fn sweep(&self, sessions: &mut Sessions, now: Instant) -> usize {
        let before = sessions.slots.len();
        let idle_ttl = self.idle_ttl;

        // A handle held elsewhere means a frame is in flight
        sessions.slots.retain(|_, slot| {
            now.saturating_duration_since(slot.last_access) <= idle_ttl
                || Arc::strong_count(&slot.record) > 1
        });
        sessions.last_sweep = now;

        let evicted = before - sessions.slots.len();
        if evicted > 0 {
            info!(evicted, remaining = sessions.slots.len(), "Evicted idle sessions");
        }
        gauge!("proctor_tracked_sessions").set(sessions.slots.len() as f64);
        evicted
    }

    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
