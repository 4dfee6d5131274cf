//! Identity mismatch hysteresis
//!
//! A live face that keeps failing to match the enrolled reference escalates
//! NONE -> WARNED -> TERMINATED. Each step needs its own run of
//! `consecutive_required` mismatches; a single match resets the run.

use detection::FaceEmbedding;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::IdentityConfig;

/// Escalation phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentityPhase {
    #[default]
    None,
    Warned,
    Terminated,
}

/// Outcome of one comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IdentityVerdict {
    /// Just moved to WARNED
    pub warn: bool,
    /// Just moved to TERMINATED
    pub terminate: bool,
}

#[derive(Debug, Clone, Default)]
pub struct IdentityTracker {
    face_mismatch_count: u32,
    phase: IdentityPhase,
}

impl IdentityTracker {
    /// Compare a live embedding against the reference.
    ///
    /// Embeddings that cannot be compared leave the tracker untouched.
    pub fn update(
        &mut self,
        live: &FaceEmbedding,
        reference: &FaceEmbedding,
        config: &IdentityConfig,
    ) -> IdentityVerdict {
        match live.distance(reference) {
            Some(distance) => self.observe_distance(distance, config),
            None => {
                debug!("Embeddings not comparable, skipping identity check");
                IdentityVerdict::default()
            }
        }
    }

    /// Feed a precomputed distance
    pub fn observe_distance(&mut self, distance: f32, config: &IdentityConfig) -> IdentityVerdict {
        if self.phase == IdentityPhase::Terminated {
            return IdentityVerdict::default();
        }

        if distance <= config.distance_threshold {
            self.face_mismatch_count = 0;
            return IdentityVerdict::default();
        }

        self.face_mismatch_count += 1;
        debug!(distance, count = self.face_mismatch_count, "Face mismatch");
        if self.face_mismatch_count < config.consecutive_required.max(1) {
            return IdentityVerdict::default();
        }

        self.face_mismatch_count = 0;
        match self.phase {
            IdentityPhase::None => {
                self.phase = IdentityPhase::Warned;
                IdentityVerdict {
                    warn: true,
                    terminate: false,
                }
            }
            IdentityPhase::Warned => {
                self.phase = IdentityPhase::Terminated;
                IdentityVerdict {
                    warn: false,
                    terminate: true,
                }
            }
            IdentityPhase::Terminated => IdentityVerdict::default(),
        }
    }

    pub fn phase(&self) -> IdentityPhase {
        self.phase
    }

    pub fn face_mismatch_count(&self) -> u32 {
        self.face_mismatch_count
    }
}
