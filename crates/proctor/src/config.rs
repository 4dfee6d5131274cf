//! Proctoring configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Debounce parameters for one anomaly channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    /// How long the anomaly must persist before it is logged (milliseconds)
    pub duration_ms: u64,

    /// Minimum spacing between two logs of the channel (milliseconds)
    pub cooldown_ms: u64,
}

impl DebounceConfig {
    pub const fn new(duration_ms: u64, cooldown_ms: u64) -> Self {
        Self {
            duration_ms,
            cooldown_ms,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self::new(1_000, 10_000)
    }
}

/// Identity mismatch hysteresis parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Cosine distance above which a live face counts as a mismatch
    pub distance_threshold: f32,

    /// Consecutive mismatches needed to advance one phase
    pub consecutive_required: u32,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 0.35,
            consecutive_required: 3,
        }
    }
}

/// Proctoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProctorConfig {
    /// Consecutive no-face frames before `NO_FACE` can fire
    pub no_face_frame_threshold: u32,

    /// Time since the face was last seen before `NO_FACE` can fire (milliseconds)
    pub no_face_window_ms: u64,

    /// Phone visible
    pub phone: DebounceConfig,

    /// Head turned away from the screen
    pub head: DebounceConfig,

    /// Gaze off the screen
    pub gaze: DebounceConfig,

    /// More than one face in view
    pub multiple_faces: DebounceConfig,

    /// Identity mismatch escalation
    pub identity: IdentityConfig,

    /// Idle time after which a session record is evicted (milliseconds)
    pub session_idle_ttl_ms: u64,

    /// Minimum spacing between idle sweeps (milliseconds)
    pub session_sweep_interval_ms: u64,
}

impl Default for ProctorConfig {
    fn default() -> Self {
        Self {
            no_face_frame_threshold: 3,
            no_face_window_ms: 8_000,
            phone: DebounceConfig::new(1_000, 10_000),
            head: DebounceConfig::new(2_000, 5_000),
            gaze: DebounceConfig::new(2_000, 5_000),
            multiple_faces: DebounceConfig::new(1_000, 10_000),
            identity: IdentityConfig::default(),
            session_idle_ttl_ms: 4 * 60 * 60 * 1_000, // longest exam
            session_sweep_interval_ms: 60_000,
        }
    }
}

impl ProctorConfig {
    /// Create strict config (shorter tolerances)
    pub fn strict() -> Self {
        Self {
            no_face_window_ms: 5_000,
            phone: DebounceConfig::new(500, 5_000),
            head: DebounceConfig::new(1_500, 4_000),
            gaze: DebounceConfig::new(1_500, 4_000),
            ..Default::default()
        }
    }

    /// Create lenient config (longer tolerances)
    pub fn lenient() -> Self {
        Self {
            no_face_window_ms: 12_000,
            head: DebounceConfig::new(3_000, 8_000),
            gaze: DebounceConfig::new(3_000, 8_000),
            identity: IdentityConfig {
                consecutive_required: 5,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn no_face_window(&self) -> Duration {
        Duration::from_millis(self.no_face_window_ms)
    }

    pub fn session_idle_ttl(&self) -> Duration {
        Duration::from_millis(self.session_idle_ttl_ms)
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.session_sweep_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_channel_uses_defaults() {
        let channel: DebounceConfig = serde_json::from_str(r#"{ "duration_ms": 500 }"#).unwrap();
        assert_eq!(channel, DebounceConfig::new(500, 10_000));
    }

    #[test]
    fn test_partial_config_keeps_other_channels() {
        let config: ProctorConfig =
            serde_json::from_str(r#"{ "phone": { "cooldown_ms": 2000 } }"#).unwrap();
        assert_eq!(config.phone, DebounceConfig::new(1_000, 2_000));
        assert_eq!(config.head, DebounceConfig::new(2_000, 5_000));
        assert_eq!(config.no_face_frame_threshold, 3);
    }

    #[test]
    fn test_presets_tighten_and_relax() {
        let strict = ProctorConfig::strict();
        let lenient = ProctorConfig::lenient();
        let default = ProctorConfig::default();
        assert!(strict.no_face_window() < default.no_face_window());
        assert!(lenient.no_face_window() > default.no_face_window());
        assert!(lenient.identity.consecutive_required > default.identity.consecutive_required);
    }
}
