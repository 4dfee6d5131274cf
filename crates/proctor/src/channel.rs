//! Debounced anomaly channel
//!
//! Turns a per-frame "currently anomalous" reading into at most one event per
//! sustained incident. An incident is identified by its category and the time
//! it started; it must last `duration` before it is logged, and a channel never
//! logs twice within `cooldown`. A still-running incident is logged again once
//! the cooldown has passed.

use std::time::{Duration, Instant};

/// Debounce state of one channel for one session
#[derive(Debug, Clone)]
pub struct ChannelState<C> {
    active_since: Option<Instant>,
    category: Option<C>,
    last_logged_at: Option<Instant>,
}

impl<C> Default for ChannelState<C> {
    fn default() -> Self {
        Self {
            active_since: None,
            category: None,
            last_logged_at: None,
        }
    }
}

impl<C: Copy + PartialEq> ChannelState<C> {
    /// Feed the current reading; returns the category to log, if any.
    pub fn update(
        &mut self,
        now: Instant,
        current: C,
        baseline: C,
        duration: Duration,
        cooldown: Duration,
    ) -> Option<C> {
        if current == baseline {
            self.active_since = None;
            self.category = None;
            return None;
        }

        let active_since = match (self.category, self.active_since) {
            (Some(category), Some(since)) if category == current => since,
            _ => {
                // New incident, or the anomaly changed category
                self.category = Some(current);
                self.active_since = Some(now);
                return None;
            }
        };

        if now.saturating_duration_since(active_since) < duration {
            return None;
        }

        if let Some(last) = self.last_logged_at {
            if now.saturating_duration_since(last) <= cooldown {
                return None;
            }
        }

        self.last_logged_at = Some(now);
        Some(current)
    }

    /// Start of the running incident
    pub fn active_since(&self) -> Option<Instant> {
        self.active_since
    }

    /// Category of the running incident
    pub fn category(&self) -> Option<C> {
        self.category
    }

    /// Last time the channel produced an event
    pub fn last_logged_at(&self) -> Option<Instant> {
        self.last_logged_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use detection::HeadDirection;
    use proptest::prelude::*;

    const DURATION: Duration = Duration::from_secs(2);
    const COOLDOWN: Duration = Duration::from_secs(5);

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    fn feed(
        state: &mut ChannelState<HeadDirection>,
        now: Instant,
        dir: HeadDirection,
    ) -> Option<HeadDirection> {
        state.update(now, dir, HeadDirection::Center, DURATION, COOLDOWN)
    }

    #[test]
    fn test_fires_after_duration() {
        let t0 = Instant::now();
        let mut state = ChannelState::default();

        assert_eq!(feed(&mut state, at(t0, 0), HeadDirection::Left), None);
        assert_eq!(feed(&mut state, at(t0, 1_000), HeadDirection::Left), None);
        assert_eq!(
            feed(&mut state, at(t0, 2_000), HeadDirection::Left),
            Some(HeadDirection::Left)
        );
        // Incident keeps running after the log
        assert_eq!(state.active_since(), Some(t0));
        assert_eq!(state.last_logged_at(), Some(at(t0, 2_000)));
    }

    #[test]
    fn test_cooldown_spaces_relogs() {
        let t0 = Instant::now();
        let mut state = ChannelState::default();

        feed(&mut state, at(t0, 0), HeadDirection::Left);
        assert!(feed(&mut state, at(t0, 2_000), HeadDirection::Left).is_some());
        assert!(feed(&mut state, at(t0, 4_000), HeadDirection::Left).is_none());
        // Exactly at the cooldown boundary is still suppressed
        assert!(feed(&mut state, at(t0, 7_000), HeadDirection::Left).is_none());
        assert!(feed(&mut state, at(t0, 7_001), HeadDirection::Left).is_some());
    }

    #[test]
    fn test_category_change_restarts_timer() {
        let t0 = Instant::now();
        let mut state = ChannelState::default();

        feed(&mut state, at(t0, 0), HeadDirection::Left);
        assert!(feed(&mut state, at(t0, 1_500), HeadDirection::Right).is_none());
        assert_eq!(state.active_since(), Some(at(t0, 1_500)));
        assert!(feed(&mut state, at(t0, 3_000), HeadDirection::Right).is_none());
        assert_eq!(
            feed(&mut state, at(t0, 3_500), HeadDirection::Right),
            Some(HeadDirection::Right)
        );
    }

    #[test]
    fn test_category_churn_respects_cooldown() {
        let t0 = Instant::now();
        let mut state = ChannelState::default();

        feed(&mut state, at(t0, 0), HeadDirection::Left);
        assert!(feed(&mut state, at(t0, 2_000), HeadDirection::Left).is_some());
        feed(&mut state, at(t0, 2_100), HeadDirection::Right);
        // New incident satisfied its duration but the channel is cooling down
        assert!(feed(&mut state, at(t0, 4_500), HeadDirection::Right).is_none());
        assert!(feed(&mut state, at(t0, 7_500), HeadDirection::Right).is_some());
    }

    #[test]
    fn test_baseline_resets_incident() {
        let t0 = Instant::now();
        let mut state = ChannelState::default();

        feed(&mut state, at(t0, 0), HeadDirection::Left);
        feed(&mut state, at(t0, 1_900), HeadDirection::Center);
        assert_eq!(state.active_since(), None);
        assert_eq!(state.category(), None);

        // Coming back is a brand-new incident
        assert!(feed(&mut state, at(t0, 2_000), HeadDirection::Left).is_none());
        assert!(feed(&mut state, at(t0, 3_000), HeadDirection::Left).is_none());
        assert!(feed(&mut state, at(t0, 4_000), HeadDirection::Left).is_some());
    }

    #[test]
    fn test_boolean_channel() {
        let t0 = Instant::now();
        let mut phone = ChannelState::default();
        let d = Duration::from_secs(1);
        let c = Duration::from_secs(10);

        assert_eq!(phone.update(at(t0, 0), false, false, d, c), None);
        assert_eq!(phone.update(at(t0, 100), true, false, d, c), None);
        assert_eq!(phone.update(at(t0, 1_100), true, false, d, c), Some(true));
    }

    proptest! {
        // Same category held continuously: first log no earlier than `duration`,
        // logs spaced by more than `cooldown`, and no missed log once both allow it.
        #[test]
        fn sustained_incident_independent_of_frame_rate(step_ms in 30u64..3_000, frames in 1usize..400) {
            let t0 = Instant::now();
            let mut state = ChannelState::default();
            let mut logged: Vec<u64> = Vec::new();

            for i in 0..frames {
                let t = i as u64 * step_ms;
                if feed(&mut state, at(t0, t), HeadDirection::Down).is_some() {
                    logged.push(t);
                }
            }

            let duration_ms = DURATION.as_millis() as u64;
            let cooldown_ms = COOLDOWN.as_millis() as u64;

            if let Some(first) = logged.first() {
                prop_assert!(*first >= duration_ms);
                prop_assert!(*first < duration_ms + step_ms);
            }
            for pair in logged.windows(2) {
                prop_assert!(pair[1] - pair[0] > cooldown_ms);
                prop_assert!(pair[1] - pair[0] <= cooldown_ms + step_ms);
            }

            let last_frame = (frames as u64 - 1) * step_ms;
            if logged.is_empty() {
                prop_assert!(last_frame < duration_ms);
            } else {
                prop_assert!(last_frame - logged[logged.len() - 1] <= cooldown_ms + step_ms);
            }
        }
    }
}
