//! Event weights and attempt evaluation

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Status reported for a terminated attempt
pub const STATUS_TERMINATED: &str = "TERMINATED";

/// Warning reported once the score crosses the warning threshold
pub const WARNING_FINAL: &str = "FINAL_WARNING";

/// Scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight per event kind (matched case-insensitively)
    pub weights: HashMap<String, u32>,
    /// Weight for kinds missing from `weights`
    pub default_weight: u32,
    /// Score at which `FINAL_WARNING` is reported
    pub warning_score: u32,
    /// Score at which the attempt is terminated
    pub termination_score: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let weights = [
            ("NO_FACE", 3),
            ("MULTIPLE_FACES", 5),
            ("PHONE_DETECTED", 8),
            ("LOOKING_LEFT", 1),
            ("LOOKING_RIGHT", 1),
            ("LOOKING_UP", 1),
            ("LOOKING_DOWN", 1),
            ("GAZE_LEFT", 1),
            ("GAZE_RIGHT", 1),
            ("GAZE_UP", 1),
            ("GAZE_DOWN", 1),
            ("IDENTITY_MISMATCH_WARNING", 5),
            ("FACE_MISMATCH", 10),
        ]
        .into_iter()
        .map(|(kind, weight)| (kind.to_string(), weight))
        .collect();

        Self {
            weights,
            default_weight: 1,
            warning_score: 30,
            termination_score: 60,
        }
    }
}

impl ScoringConfig {
    /// Weight of an event kind
    pub fn weight_of(&self, kind: &str) -> u32 {
        self.weights
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(kind))
            .map(|(_, w)| *w)
            .unwrap_or(self.default_weight)
    }

    /// Evaluate an attempt from its score and explicit termination flag
    pub fn evaluate(&self, cheating_score: u32, terminated: bool) -> AttemptEvaluation {
        let terminated = terminated || cheating_score >= self.termination_score;
        AttemptEvaluation {
            status: terminated.then(|| STATUS_TERMINATED.to_string()),
            warning: (!terminated && cheating_score >= self.warning_score)
                .then(|| WARNING_FINAL.to_string()),
            cheating_score,
        }
    }
}

/// Scoring engine output merged into the frame response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptEvaluation {
    pub status: Option<String>,
    pub warning: Option<String>,
    pub cheating_score: u32,
}

impl AttemptEvaluation {
    pub fn is_terminated(&self) -> bool {
        self.status.as_deref() == Some(STATUS_TERMINATED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_lookup_ignores_case() {
        let config = ScoringConfig::default();
        assert_eq!(config.weight_of("PHONE_DETECTED"), 8);
        assert_eq!(config.weight_of("phone_detected"), 8);
        assert_eq!(config.weight_of("SOMETHING_ELSE"), 1);
    }

    #[test]
    fn test_evaluation_thresholds() {
        let config = ScoringConfig::default();

        let calm = config.evaluate(5, false);
        assert_eq!(calm.status, None);
        assert_eq!(calm.warning, None);

        let warned = config.evaluate(30, false);
        assert_eq!(warned.warning.as_deref(), Some(WARNING_FINAL));
        assert!(!warned.is_terminated());

        let over = config.evaluate(60, false);
        assert!(over.is_terminated());
        assert_eq!(over.warning, None);

        assert!(config.evaluate(0, true).is_terminated());
    }
}
