//! Passive detectors used when no model is configured
//!
//! They keep the service answering without fabricating anomalies: the face
//! detector reports one frontal face, the phone detector never fires, and the
//! embedder never produces a vector (so identity never escalates).

use frame_capture::VideoFrame;

use crate::{
    DetectedFace, DetectionError, FaceBbox, FaceDetector, FaceEmbedder, FaceEmbedding,
    FaceLandmarks, PhoneDetector, Point,
};

/// Reports a single centered, frontal face
pub struct PassiveFaceDetector;

impl FaceDetector for PassiveFaceDetector {
    fn detect_faces(&self, frame: &VideoFrame) -> Result<Vec<DetectedFace>, DetectionError> {
        let w = frame.width as f32;
        let h = frame.height as f32;
        let left_eye = Point::new(w * 0.4, h * 0.35);
        let right_eye = Point::new(w * 0.6, h * 0.35);

        Ok(vec![DetectedFace {
            bbox: FaceBbox {
                x: w * 0.3,
                y: h * 0.2,
                width: w * 0.4,
                height: h * 0.5,
                confidence: 0.95,
            },
            landmarks: FaceLandmarks {
                left_eye,
                right_eye,
                nose: Point::new(w * 0.5, h * 0.45),
                mouth: Point::new(w * 0.5, h * 0.55),
                left_iris: Some(left_eye),
                right_iris: Some(right_eye),
            },
        }])
    }
}

/// Never reports a phone
pub struct NoPhoneDetector;

impl PhoneDetector for NoPhoneDetector {
    fn detect_phone(&self, _frame: &VideoFrame) -> Result<bool, DetectionError> {
        Ok(false)
    }
}

/// Never produces an embedding
pub struct PassiveEmbedder;

impl FaceEmbedder for PassiveEmbedder {
    fn embed(&self, _face_crop: &VideoFrame) -> Result<Option<FaceEmbedding>, DetectionError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DirectionThresholds, FaceAnalyzer, HeadDirection};
    use std::sync::Arc;

    #[test]
    fn test_passive_face_is_frontal() {
        let frame = VideoFrame::new(vec![0; 64 * 48 * 3], 64, 48).unwrap();
        let analyzer =
            FaceAnalyzer::new(Arc::new(PassiveFaceDetector), DirectionThresholds::default());
        let obs = analyzer.analyze(&frame).unwrap();
        assert_eq!(obs.faces, 1);
        assert_eq!(obs.direction, HeadDirection::Center);
        assert!(obs.event.is_none());
    }
}
