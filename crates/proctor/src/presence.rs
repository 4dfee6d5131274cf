//! No-face tolerance
//!
//! A missing face is only reported once it persists both in frame count and in
//! wall-clock time since the face was last seen. After a report the frame
//! counter restarts but the time anchor does not, so a continuing absence is
//! reported again every `frame_threshold` frames.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct PresenceTracker {
    last_face_seen_at: Instant,
    consecutive_no_face_frames: u32,
}

impl PresenceTracker {
    /// Start tracking; the session start counts as the last sighting
    pub fn new(now: Instant) -> Self {
        Self {
            last_face_seen_at: now,
            consecutive_no_face_frames: 0,
        }
    }

    /// Feed the face count of a frame; returns `true` when `NO_FACE` should be logged
    pub fn update(
        &mut self,
        now: Instant,
        face_count: usize,
        frame_threshold: u32,
        window: Duration,
    ) -> bool {
        if face_count > 0 {
            // Frames may be applied out of capture order
            if now > self.last_face_seen_at {
                self.last_face_seen_at = now;
            }
            self.consecutive_no_face_frames = 0;
            return false;
        }

        self.consecutive_no_face_frames = self.consecutive_no_face_frames.saturating_add(1);

        let enough_frames = self.consecutive_no_face_frames >= frame_threshold;
        let long_enough = now.saturating_duration_since(self.last_face_seen_at) > window;
        if enough_frames && long_enough {
            self.consecutive_no_face_frames = 0;
            return true;
        }

        false
    }

    pub fn last_face_seen_at(&self) -> Instant {
        self.last_face_seen_at
    }

    pub fn consecutive_no_face_frames(&self) -> u32 {
        self.consecutive_no_face_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(8);

    fn at(base: Instant, secs: u64) -> Instant {
        base + Duration::from_secs(secs)
    }

    #[test]
    fn test_frames_without_window_do_not_fire() {
        let t0 = Instant::now();
        let mut tracker = PresenceTracker::new(t0);

        for s in 1..=6 {
            assert!(!tracker.update(at(t0, s), 0, 3, WINDOW));
        }
        assert_eq!(tracker.consecutive_no_face_frames(), 6);
    }

    #[test]
    fn test_window_without_frames_does_not_fire() {
        let t0 = Instant::now();
        let mut tracker = PresenceTracker::new(t0);

        assert!(!tracker.update(at(t0, 20), 0, 3, WINDOW));
        assert!(!tracker.update(at(t0, 21), 0, 3, WINDOW));
        assert!(tracker.update(at(t0, 22), 0, 3, WINDOW));
    }

    #[test]
    fn test_window_is_strict() {
        let t0 = Instant::now();
        let mut tracker = PresenceTracker::new(t0);

        assert!(!tracker.update(at(t0, 6), 0, 3, WINDOW));
        assert!(!tracker.update(at(t0, 7), 0, 3, WINDOW));
        assert!(!tracker.update(at(t0, 8), 0, 3, WINDOW));
        assert!(tracker.update(at(t0, 9), 0, 3, WINDOW));
    }

    #[test]
    fn test_sustained_absence_retriggers_every_threshold_frames() {
        let t0 = Instant::now();
        let mut tracker = PresenceTracker::new(t0);

        let fired: Vec<u64> = (7..=15)
            .filter(|s| tracker.update(at(t0, *s), 0, 3, WINDOW))
            .collect();
        assert_eq!(fired, vec![9, 12, 15]);
        assert_eq!(tracker.last_face_seen_at(), t0);
    }

    #[test]
    fn test_face_resets() {
        let t0 = Instant::now();
        let mut tracker = PresenceTracker::new(t0);

        tracker.update(at(t0, 10), 0, 3, WINDOW);
        tracker.update(at(t0, 11), 0, 3, WINDOW);
        assert!(!tracker.update(at(t0, 12), 1, 3, WINDOW));
        assert_eq!(tracker.consecutive_no_face_frames(), 0);
        assert_eq!(tracker.last_face_seen_at(), at(t0, 12));

        // Needs a fresh window from the new sighting
        for s in 13..=20 {
            assert!(!tracker.update(at(t0, s), 0, 3, WINDOW));
        }
        assert!(tracker.update(at(t0, 21), 0, 3, WINDOW));
    }

    #[test]
    fn test_late_sighting_keeps_anchor() {
        let t0 = Instant::now();
        let mut tracker = PresenceTracker::new(t0);

        tracker.update(at(t0, 10), 1, 3, WINDOW);
        tracker.update(at(t0, 4), 1, 3, WINDOW);
        assert_eq!(tracker.last_face_seen_at(), at(t0, 10));
    }
}
