//! Frame orchestrator
//!
//! Runs the detectors on a frame, feeds every channel of the attempt's
//! tracking record, logs the resulting events and merges the scorer's verdict.

use detection::{
    DetectionError, DetectorSuite, FaceEmbedding, FaceObservation, GazeDirection, HeadDirection,
};
use frame_capture::{decode_data_url, VideoFrame};
use metrics::counter;
use std::sync::Arc;
use std::time::Instant;
use storage::{AttemptScoring, EventLog, ReferenceEmbeddings, Repository};
use tracing::{debug, info, warn};

use crate::analysis::{EventKind, FrameVerdict, WARNING_IDENTITY_MISMATCH};
use crate::registry::SessionRegistry;
use crate::state::SessionTrackingRecord;
use crate::{AttemptId, ProctorConfig, ProctorError};

/// External services the orchestrator reports to
#[derive(Clone)]
pub struct Collaborators {
    pub events: Arc<dyn EventLog>,
    pub scoring: Arc<dyn AttemptScoring>,
    pub references: Arc<dyn ReferenceEmbeddings>,
}

impl Collaborators {
    /// Use one repository for all three roles
    pub fn from_repository(repository: Arc<Repository>) -> Self {
        Self {
            events: repository.clone(),
            scoring: repository.clone(),
            references: repository,
        }
    }
}

/// Detector outputs for one frame, gathered outside the session lock
struct FrameSignals {
    phone: Result<bool, DetectionError>,
    faces: Result<FaceObservation, DetectionError>,
    /// Only computed for a single face when a reference exists
    embedding: Option<Result<Option<FaceEmbedding>, DetectionError>>,
}

/// Transitions applied to the record for one frame
#[derive(Default)]
struct FrameOutcome {
    verdict: FrameVerdict,
    terminate: bool,
}

pub struct FrameOrchestrator {
    config: ProctorConfig,
    detectors: DetectorSuite,
    collaborators: Collaborators,
    registry: SessionRegistry,
}

impl FrameOrchestrator {
    pub fn new(
        config: ProctorConfig,
        detectors: DetectorSuite,
        collaborators: Collaborators,
    ) -> Self {
        let registry =
            SessionRegistry::new(config.session_idle_ttl(), config.session_sweep_interval());
        Self {
            config,
            detectors,
            collaborators,
            registry,
        }
    }

    pub fn config(&self) -> &ProctorConfig {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub(crate) fn detectors(&self) -> &DetectorSuite {
        &self.detectors
    }

    pub(crate) fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Decode an encoded image payload and analyze it.
    ///
    /// A terminated attempt is answered before the payload is even decoded.
    /// A payload that fails to decode leaves the attempt untouched.
    pub async fn process_payload(
        &self,
        attempt_id: AttemptId,
        payload: String,
    ) -> Result<FrameVerdict, ProctorError> {
        if self.is_terminated(attempt_id).await {
            debug!(attempt_id, "Frame for terminated attempt");
            return Ok(FrameVerdict::terminal());
        }

        let frame = tokio::task::spawn_blocking(move || decode_data_url(&payload))
            .await
            .map_err(|e| ProctorError::Task(e.to_string()))??;

        self.process_frame(attempt_id, frame).await
    }

    /// Analyze a decoded frame
    pub async fn process_frame(
        &self,
        attempt_id: AttemptId,
        frame: VideoFrame,
    ) -> Result<FrameVerdict, ProctorError> {
        self.process_frame_at(attempt_id, frame, Instant::now()).await
    }

    /// Analyze a decoded frame observed at `now`
    pub async fn process_frame_at(
        &self,
        attempt_id: AttemptId,
        frame: VideoFrame,
        now: Instant,
    ) -> Result<FrameVerdict, ProctorError> {
        counter!("proctor_frames_total").increment(1);

        let record = self.registry.session(attempt_id, now);
        {
            let mut guard = record.lock().await;
            guard.touch(now);
            if !guard.status_checked {
                // Fresh record, possibly for an attempt evicted after termination
                guard.status_checked = true;
                self.restore_status(&mut guard);
            }
            if guard.is_terminal() {
                return Ok(FrameVerdict::terminal());
            }
        }

        let reference = self.reference_embedding(attempt_id);
        let signals = self.run_detectors(frame, reference.is_some()).await?;

        let FrameOutcome {
            mut verdict,
            terminate,
        } = {
            let mut guard = record.lock().await;
            // A concurrent frame may have terminated the attempt while we were detecting
            if guard.is_terminal() {
                return Ok(FrameVerdict::terminal());
            }
            guard.touch(now);
            self.apply(&mut guard, now, signals, reference.as_ref())
        };

        self.log_events(attempt_id, &verdict.events);

        if terminate {
            counter!("proctor_terminations_total").increment(1);
            info!(attempt_id, "Identity mismatch persisted, terminating attempt");
            if let Err(e) = self.collaborators.scoring.terminate_attempt(attempt_id) {
                warn!(attempt_id, "Failed to terminate attempt: {}", e);
            }
            verdict.status = Some(storage::STATUS_TERMINATED.to_string());
            return Ok(verdict);
        }

        match self.collaborators.scoring.evaluate_attempt(attempt_id) {
            Ok(evaluation) => verdict.merge_evaluation(evaluation),
            Err(e) => warn!(attempt_id, "Attempt evaluation failed: {}", e),
        }

        if verdict.is_terminated() {
            let mut guard = record.lock().await;
            if !guard.closed {
                guard.closed = true;
                counter!("proctor_terminations_total").increment(1);
                info!(attempt_id, "Scorer terminated attempt, closing session");
            }
        }

        Ok(verdict)
    }

    async fn is_terminated(&self, attempt_id: AttemptId) -> bool {
        match self.registry.get(attempt_id) {
            Some(record) => record.lock().await.is_terminal(),
            None => false,
        }
    }

    /// Close a fresh record whose attempt the scorer already terminated
    fn restore_status(&self, record: &mut SessionTrackingRecord) {
        let attempt_id = record.attempt_id;
        match self.collaborators.scoring.evaluate_attempt(attempt_id) {
            Ok(evaluation) if evaluation.is_terminated() => {
                debug!(attempt_id, "Attempt already terminated, closing session");
                record.closed = true;
            }
            Ok(_) => {}
            Err(e) => warn!(attempt_id, "Attempt status lookup failed: {}", e),
        }
    }

    fn reference_embedding(&self, attempt_id: AttemptId) -> Option<FaceEmbedding> {
        match self.collaborators.references.reference_embedding(attempt_id) {
            Ok(reference) => reference.map(FaceEmbedding::new),
            Err(e) => {
                warn!(attempt_id, "Reference embedding lookup failed: {}", e);
                None
            }
        }
    }

    async fn run_detectors(
        &self,
        frame: VideoFrame,
        want_embedding: bool,
    ) -> Result<FrameSignals, ProctorError> {
        let detectors = self.detectors.clone();

        tokio::task::spawn_blocking(move || {
            let phone = detectors.phone.detect_phone(&frame);
            let faces = detectors.faces.analyze(&frame);

            let embedding = match &faces {
                Ok(obs) if want_embedding && obs.faces == 1 => obs
                    .face_crop
                    .as_ref()
                    .map(|crop| detectors.embedder.embed(crop)),
                _ => None,
            };

            FrameSignals {
                phone,
                faces,
                embedding,
            }
        })
        .await
        .map_err(|e| ProctorError::Task(e.to_string()))
    }

    /// Apply one frame's signals to the record
    fn apply(
        &self,
        record: &mut SessionTrackingRecord,
        now: Instant,
        signals: FrameSignals,
        reference: Option<&FaceEmbedding>,
    ) -> FrameOutcome {
        let config = &self.config;
        let attempt_id = record.attempt_id;
        let mut outcome = FrameOutcome::default();
        let verdict = &mut outcome.verdict;

        // Phone does not depend on a face being present
        match signals.phone {
            Ok(present) => {
                verdict.phone_detected = present;
                let fired = record.phone.update(
                    now,
                    present,
                    false,
                    config.phone.duration(),
                    config.phone.cooldown(),
                );
                if fired.is_some() {
                    verdict.events.push(EventKind::PhoneDetected);
                }
            }
            Err(e) => warn!(attempt_id, "Phone detection failed: {}", e),
        }

        let observation = match signals.faces {
            Ok(observation) => observation,
            Err(e) => {
                warn!(attempt_id, "Face analysis failed: {}", e);
                return outcome;
            }
        };
        verdict.faces_detected = observation.faces;
        // The hint mirrors what the channels below derive from the counts
        debug!(attempt_id, faces = observation.faces, hint = ?observation.event, "Face analysis");

        let absent = record.presence.update(
            now,
            observation.faces,
            config.no_face_frame_threshold,
            config.no_face_window(),
        );
        if observation.faces == 0 {
            if absent {
                verdict.events.push(EventKind::NoFace);
            }
            return outcome;
        }

        let crowded = record.multiple_faces.update(
            now,
            observation.faces > 1,
            false,
            config.multiple_faces.duration(),
            config.multiple_faces.cooldown(),
        );
        if crowded.is_some() {
            verdict.events.push(EventKind::MultipleFaces);
        }

        if let (Some(reference), Some(embedding)) = (reference, signals.embedding) {
            match embedding {
                Ok(Some(live)) => {
                    let identity = record.identity.update(&live, reference, &config.identity);
                    if identity.warn {
                        verdict.events.push(EventKind::IdentityMismatchWarning);
                        verdict.warning = Some(WARNING_IDENTITY_MISMATCH.to_string());
                    }
                    if identity.terminate {
                        verdict.events.push(EventKind::FaceMismatch);
                        outcome.terminate = true;
                        return outcome;
                    }
                }
                Ok(None) => debug!(attempt_id, "No embedding for live face"),
                Err(e) => warn!(attempt_id, "Face embedding failed: {}", e),
            }
        }

        verdict.direction = observation.direction;
        verdict.gaze = observation.gaze;

        let head = record.head.update(
            now,
            observation.direction,
            HeadDirection::Center,
            config.head.duration(),
            config.head.cooldown(),
        );
        if let Some(direction) = head {
            verdict.events.push(EventKind::Looking(direction));
        }

        let gaze = record.gaze.update(
            now,
            observation.gaze,
            GazeDirection::Center,
            config.gaze.duration(),
            config.gaze.cooldown(),
        );
        if let Some(gaze) = gaze {
            verdict.events.push(EventKind::Gaze(gaze));
        }

        outcome
    }

    /// Hand events to the event log; failures never fail the frame
    fn log_events(&self, attempt_id: AttemptId, events: &[EventKind]) {
        for kind in events {
            counter!("proctor_events_total", "kind" => kind.as_str()).increment(1);
            match self.collaborators.events.log_event(attempt_id, kind.as_str()) {
                Ok(record) => {
                    info!(attempt_id, kind = %kind, weight = record.weight, "Cheating event")
                }
                Err(e) => warn!(attempt_id, kind = %kind, "Failed to log event: {}", e),
            }
        }
    }
}
