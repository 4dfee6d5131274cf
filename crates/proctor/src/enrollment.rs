//! One-time face enrollment
//!
//! Stores the reference embedding that identity checks compare live faces
//! against. The snapshot must show exactly one face.

use detection::{DetectionError, DetectorSuite, FaceEmbedding};
use frame_capture::{decode_data_url, CaptureError};
use storage::StorageError;
use thiserror::Error;
use tracing::info;

use crate::{AttemptId, FrameOrchestrator};

/// Enrollment error types
#[derive(Error, Debug)]
pub enum EnrollmentError {
    #[error("Invalid image: {0}")]
    Decode(#[from] CaptureError),

    #[error("No face detected")]
    NoFace,

    #[error("Multiple faces detected")]
    MultipleFaces,

    #[error("FACE_EMBEDDING_FAILED")]
    EmbeddingFailed,

    #[error("Face analysis failed: {0}")]
    Detection(#[from] DetectionError),

    #[error("Failed to store reference: {0}")]
    Storage(#[from] StorageError),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl EnrollmentError {
    /// Whether the snapshot itself was unusable (as opposed to a server fault)
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            EnrollmentError::Decode(_)
                | EnrollmentError::NoFace
                | EnrollmentError::MultipleFaces
                | EnrollmentError::EmbeddingFailed
        )
    }
}

impl FrameOrchestrator {
    /// Register the candidate's reference face from an encoded snapshot
    pub async fn enroll(
        &self,
        attempt_id: AttemptId,
        payload: String,
    ) -> Result<(), EnrollmentError> {
        let detectors = self.detectors().clone();

        let embedding =
            tokio::task::spawn_blocking(move || reference_from_snapshot(&detectors, &payload))
                .await
                .map_err(|e| EnrollmentError::Task(e.to_string()))??;

        self.collaborators()
            .references
            .save_reference_embedding(attempt_id, embedding.vector)?;
        info!(attempt_id, "Reference face enrolled");
        Ok(())
    }
}

/// Decode a snapshot and embed its single face
fn reference_from_snapshot(
    detectors: &DetectorSuite,
    payload: &str,
) -> Result<FaceEmbedding, EnrollmentError> {
    let frame = decode_data_url(payload)?;
    let extraction = detectors.faces.extract_face(&frame)?;

    match extraction.face_count {
        0 => return Err(EnrollmentError::NoFace),
        1 => {}
        _ => return Err(EnrollmentError::MultipleFaces),
    }

    let crop = extraction.crop.ok_or(EnrollmentError::EmbeddingFailed)?;
    detectors
        .embedder
        .embed(&crop)?
        .filter(FaceEmbedding::is_usable)
        .ok_or(EnrollmentError::EmbeddingFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::tests::{frontal_face, Harness, ScriptedEmbedder, ScriptedFaces};
    use crate::ProctorConfig;
    use base64::Engine;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;
    use storage::ReferenceEmbeddings;

    fn snapshot() -> String {
        let img = RgbImage::from_pixel(32, 32, image::Rgb([90, 120, 150]));
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png).unwrap();
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes.into_inner())
        )
    }

    #[tokio::test]
    async fn test_enroll_saves_reference() {
        let h = Harness::new(
            ProctorConfig::default(),
            ScriptedFaces::with(vec![frontal_face(0.9)]),
            ScriptedEmbedder::with(vec![0.6, 0.8]),
        );

        h.orchestrator.enroll(4, snapshot()).await.unwrap();
        assert_eq!(h.repository.reference_embedding(4).unwrap(), Some(vec![0.6, 0.8]));
    }

    #[tokio::test]
    async fn test_enroll_rejects_no_face() {
        let h = Harness::new(
            ProctorConfig::default(),
            ScriptedFaces::default(),
            ScriptedEmbedder::with(vec![0.6, 0.8]),
        );

        let err = h.orchestrator.enroll(4, snapshot()).await.unwrap_err();
        assert!(matches!(err, EnrollmentError::NoFace));
        assert_eq!(err.to_string(), "No face detected");
        assert_eq!(h.repository.reference_embedding(4).unwrap(), None);
    }

    #[tokio::test]
    async fn test_enroll_rejects_multiple_faces() {
        let h = Harness::new(
            ProctorConfig::default(),
            ScriptedFaces::with(vec![frontal_face(0.9), frontal_face(0.7)]),
            ScriptedEmbedder::with(vec![0.6, 0.8]),
        );

        let err = h.orchestrator.enroll(4, snapshot()).await.unwrap_err();
        assert!(matches!(err, EnrollmentError::MultipleFaces));
        assert!(err.is_rejection());
    }

    #[tokio::test]
    async fn test_enroll_rejects_missing_embedding() {
        let h = Harness::new(
            ProctorConfig::default(),
            ScriptedFaces::with(vec![frontal_face(0.9)]),
            ScriptedEmbedder::default(),
        );

        let err = h.orchestrator.enroll(4, snapshot()).await.unwrap_err();
        assert_eq!(err.to_string(), "FACE_EMBEDDING_FAILED");
        assert_eq!(h.repository.reference_embedding(4).unwrap(), None);
    }

    #[tokio::test]
    async fn test_enroll_rejects_bad_image() {
        let h = Harness::new(
            ProctorConfig::default(),
            ScriptedFaces::with(vec![frontal_face(0.9)]),
            ScriptedEmbedder::with(vec![0.6, 0.8]),
        );

        let err = h.orchestrator.enroll(4, "data:image/png;base64,AAAA".into()).await.unwrap_err();
        assert!(matches!(err, EnrollmentError::Decode(_)));
        assert_eq!(h.detector_calls(), 0);
    }
}
