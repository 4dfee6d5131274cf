//! Frame verdicts and proctoring events

use detection::{GazeDirection, HeadDirection};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Warning returned when identity checks first escalate
pub const WARNING_IDENTITY_MISMATCH: &str = "IDENTITY_MISMATCH";

/// Proctoring event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// No face for long enough
    NoFace,

    /// Several people in view
    MultipleFaces,

    /// Phone visible
    PhoneDetected,

    /// Head turned away
    Looking(HeadDirection),

    /// Eyes off screen
    Gaze(GazeDirection),

    /// Face stopped matching the enrolled reference
    IdentityMismatchWarning,

    /// Face kept not matching after the warning (terminates the attempt)
    FaceMismatch,
}

impl EventKind {
    /// Event name as recorded in the event log
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::NoFace => "NO_FACE",
            EventKind::MultipleFaces => "MULTIPLE_FACES",
            EventKind::PhoneDetected => "PHONE_DETECTED",
            EventKind::Looking(HeadDirection::Left) => "LOOKING_LEFT",
            EventKind::Looking(HeadDirection::Right) => "LOOKING_RIGHT",
            EventKind::Looking(HeadDirection::Up) => "LOOKING_UP",
            EventKind::Looking(HeadDirection::Down) => "LOOKING_DOWN",
            EventKind::Looking(HeadDirection::Center) => "LOOKING_CENTER",
            EventKind::Gaze(GazeDirection::Left) => "GAZE_LEFT",
            EventKind::Gaze(GazeDirection::Right) => "GAZE_RIGHT",
            EventKind::Gaze(GazeDirection::Up) => "GAZE_UP",
            EventKind::Gaze(GazeDirection::Down) => "GAZE_DOWN",
            EventKind::Gaze(GazeDirection::Center) => "GAZE_CENTER",
            EventKind::IdentityMismatchWarning => "IDENTITY_MISMATCH_WARNING",
            EventKind::FaceMismatch => "FACE_MISMATCH",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response for one analyzed frame
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameVerdict {
    pub faces_detected: usize,
    pub direction: HeadDirection,
    pub gaze: GazeDirection,
    pub phone_detected: bool,
    pub status: Option<String>,
    pub warning: Option<String>,

    /// Events logged while processing this frame
    #[serde(skip)]
    pub events: Vec<EventKind>,
}

impl FrameVerdict {
    /// Verdict of an attempt that no longer accepts frames
    pub fn terminal() -> Self {
        Self {
            status: Some(storage::STATUS_TERMINATED.to_string()),
            ..Default::default()
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.status.as_deref() == Some(storage::STATUS_TERMINATED)
    }

    /// Fill status and warning from the scorer where still unset
    pub fn merge_evaluation(&mut self, evaluation: storage::AttemptEvaluation) {
        if self.status.is_none() {
            self.status = evaluation.status;
        }
        if self.warning.is_none() {
            self.warning = evaluation.warning;
        }
    }
}
