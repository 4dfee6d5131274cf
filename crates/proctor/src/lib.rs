//! Exam Proctoring Session Core
//!
//! Turns per-frame detector readings into debounced cheating events:
//! - Phone, head direction, gaze and multiple-faces channels with
//!   duration and cooldown debouncing
//! - No-face tolerance over both frame count and elapsed time
//! - Identity mismatch escalation (warning, then termination)
//! - Per-attempt tracking records with idle eviction
//!
//! [`FrameOrchestrator`] is the entry point; everything else is the state it
//! drives.

pub mod analysis;
pub mod channel;
pub mod config;
pub mod enrollment;
pub mod identity;
pub mod orchestrator;
pub mod presence;
pub mod registry;
pub mod state;

pub use analysis::{EventKind, FrameVerdict, WARNING_IDENTITY_MISMATCH};
pub use channel::ChannelState;
pub use config::{DebounceConfig, IdentityConfig, ProctorConfig};
pub use enrollment::EnrollmentError;
pub use identity::{IdentityPhase, IdentityTracker, IdentityVerdict};
pub use orchestrator::{Collaborators, FrameOrchestrator};
pub use presence::PresenceTracker;
pub use registry::{SessionRegistry, SharedRecord};
pub use state::SessionTrackingRecord;
pub use storage::AttemptId;

use frame_capture::CaptureError;
use thiserror::Error;

/// Frame processing error types
#[derive(Error, Debug)]
pub enum ProctorError {
    #[error("Invalid image: {0}")]
    Decode(#[from] CaptureError),

    #[error("Background task failed: {0}")]
    Task(String),
}
