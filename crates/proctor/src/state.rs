//! Per-attempt tracking state

use detection::{GazeDirection, HeadDirection};
use std::time::Instant;

use crate::channel::ChannelState;
use crate::identity::{IdentityPhase, IdentityTracker};
use crate::presence::PresenceTracker;
use crate::AttemptId;

/// Tracking record of one exam attempt (one per attempt, never shared)
#[derive(Debug, Clone)]
pub struct SessionTrackingRecord {
    pub attempt_id: AttemptId,

    /// No-face tolerance
    pub presence: PresenceTracker,

    /// Phone visible
    pub phone: ChannelState<bool>,

    /// More than one face in view
    pub multiple_faces: ChannelState<bool>,

    /// Head direction
    pub head: ChannelState<HeadDirection>,

    /// Gaze direction
    pub gaze: ChannelState<GazeDirection>,

    /// Identity mismatch escalation
    pub identity: IdentityTracker,

    /// Scorer reported the attempt terminated
    pub closed: bool,

    /// Stored attempt status consulted since the record was created
    pub status_checked: bool,

    /// Last time a frame touched this record
    pub last_frame_at: Instant,
}

impl SessionTrackingRecord {
    pub fn new(attempt_id: AttemptId, now: Instant) -> Self {
        Self {
            attempt_id,
            presence: PresenceTracker::new(now),
            phone: ChannelState::default(),
            multiple_faces: ChannelState::default(),
            head: ChannelState::default(),
            gaze: ChannelState::default(),
            identity: IdentityTracker::default(),
            closed: false,
            status_checked: false,
            last_frame_at: now,
        }
    }

    /// No further frames are analyzed once terminal
    pub fn is_terminal(&self) -> bool {
        self.closed || self.identity.phase() == IdentityPhase::Terminated
    }

    /// Mark the record as touched
    pub fn touch(&mut self, now: Instant) {
        if now > self.last_frame_at {
            self.last_frame_at = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IdentityConfig;

    #[test]
    fn test_new_record_is_open() {
        let record = SessionTrackingRecord::new(1, Instant::now());
        assert!(!record.is_terminal());
        assert!(!record.status_checked);
        assert_eq!(record.presence.consecutive_no_face_frames(), 0);
        assert_eq!(record.head.category(), None);
    }

    #[test]
    fn test_terminal_by_identity_or_close() {
        let mut record = SessionTrackingRecord::new(1, Instant::now());
        record.closed = true;
        assert!(record.is_terminal());

        let mut record = SessionTrackingRecord::new(2, Instant::now());
        let config = IdentityConfig::default();
        for _ in 0..6 {
            record.identity.observe_distance(1.0, &config);
        }
        assert!(record.is_terminal());
    }

    #[test]
    fn test_touch_is_monotonic() {
        let t0 = Instant::now();
        let later = t0 + std::time::Duration::from_secs(5);
        let mut record = SessionTrackingRecord::new(1, later);
        record.touch(t0);
        assert_eq!(record.last_frame_at, later);
    }
}
