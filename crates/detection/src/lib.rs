//! Proctoring Signal Extraction
//!
//! Per-frame computer vision used by the exam proctor:
//! - Face detection with landmarks (count, crop, head direction, gaze)
//! - Phone detection (object detector, COCO "cell phone" class)
//! - Face embeddings for identity comparison
//!
//! Every detector is a trait so the session core can run against ONNX models
//! in production and scripted fakes in tests.

pub mod config;
pub mod embedding;
pub mod face;
pub mod onnx;
pub mod passive;

pub use config::{DetectionConfig, DirectionThresholds};
pub use embedding::{cosine_distance, FaceEmbedding};
pub use face::{
    DetectedFace, FaceAnalyzer, FaceBbox, FaceEvent, FaceExtraction, FaceLandmarks,
    FaceObservation, GazeDirection, HeadDirection, Point,
};
pub use onnx::{OnnxFaceDetector, OnnxFaceEmbedder, OnnxPhoneDetector};
pub use passive::{NoPhoneDetector, PassiveEmbedder, PassiveFaceDetector};

use frame_capture::VideoFrame;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Detection error types
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Unexpected model output: {0}")]
    OutputShape(String),
}

/// Face detector producing boxes with landmarks
pub trait FaceDetector: Send + Sync {
    /// Detect all faces in the frame, most confident first
    fn detect_faces(&self, frame: &VideoFrame) -> Result<Vec<DetectedFace>, DetectionError>;
}

/// Phone / object detector
pub trait PhoneDetector: Send + Sync {
    /// Whether a phone is visible anywhere in the frame
    fn detect_phone(&self, frame: &VideoFrame) -> Result<bool, DetectionError>;
}

/// Face embedding extractor
pub trait FaceEmbedder: Send + Sync {
    /// Embed a face crop. `Ok(None)` means the extractor produced nothing usable.
    fn embed(&self, face_crop: &VideoFrame) -> Result<Option<FaceEmbedding>, DetectionError>;
}

/// The full set of detectors used per frame
#[derive(Clone)]
pub struct DetectorSuite {
    pub faces: FaceAnalyzer,
    pub phone: Arc<dyn PhoneDetector>,
    pub embedder: Arc<dyn FaceEmbedder>,
}

impl DetectorSuite {
    /// Assemble a suite from individual detectors
    pub fn new(
        face_detector: Arc<dyn FaceDetector>,
        phone: Arc<dyn PhoneDetector>,
        embedder: Arc<dyn FaceEmbedder>,
        thresholds: DirectionThresholds,
    ) -> Self {
        Self {
            faces: FaceAnalyzer::new(face_detector, thresholds),
            phone,
            embedder,
        }
    }

    /// Build ONNX-backed detectors for every configured model path.
    ///
    /// A missing path falls back to the passive detector for that signal.
    pub fn from_config(config: &DetectionConfig) -> Result<Self, DetectionError> {
        let face_detector: Arc<dyn FaceDetector> = match &config.face_model_path {
            Some(path) => Arc::new(OnnxFaceDetector::new(path, config)?),
            None => {
                warn!("No face model path configured. Using passive face detector.");
                Arc::new(PassiveFaceDetector)
            }
        };

        let phone: Arc<dyn PhoneDetector> = match &config.phone_model_path {
            Some(path) => Arc::new(OnnxPhoneDetector::new(path, config)?),
            None => {
                warn!("No phone model path configured. Phone detection disabled.");
                Arc::new(NoPhoneDetector)
            }
        };

        let embedder: Arc<dyn FaceEmbedder> = match &config.embedding_model_path {
            Some(path) => Arc::new(OnnxFaceEmbedder::new(path, config)?),
            None => {
                warn!("No embedding model path configured. Identity checks disabled.");
                Arc::new(PassiveEmbedder)
            }
        };

        Ok(Self::new(face_detector, phone, embedder, config.thresholds.clone()))
    }
}
