//! Face landmarks, head direction, and gaze classification

use frame_capture::VideoFrame;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{DetectionError, DirectionThresholds, FaceDetector};

const EPSILON: f32 = 1e-3;

/// 2D image point (pixels)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    fn distance(self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Face bounding box
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceBbox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

/// Facial landmarks in image coordinates.
///
/// `left_eye` is the eye on the left side of the image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceLandmarks {
    pub left_eye: Point,
    pub right_eye: Point,
    pub nose: Point,
    pub mouth: Point,
    pub left_iris: Option<Point>,
    pub right_iris: Option<Point>,
}

/// One detected face
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedFace {
    pub bbox: FaceBbox,
    pub landmarks: FaceLandmarks,
}

/// Head direction, from the candidate's point of view on an unmirrored capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeadDirection {
    #[default]
    Center,
    Left,
    Right,
    Up,
    Down,
}

impl HeadDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeadDirection::Center => "CENTER",
            HeadDirection::Left => "LEFT",
            HeadDirection::Right => "RIGHT",
            HeadDirection::Up => "UP",
            HeadDirection::Down => "DOWN",
        }
    }
}

/// Gaze direction, from the candidate's point of view on an unmirrored capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GazeDirection {
    #[default]
    Center,
    Left,
    Right,
    Up,
    Down,
}

impl GazeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            GazeDirection::Center => "CENTER",
            GazeDirection::Left => "LEFT",
            GazeDirection::Right => "RIGHT",
            GazeDirection::Up => "UP",
            GazeDirection::Down => "DOWN",
        }
    }
}

/// Event hint derived from a single frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaceEvent {
    NoFace,
    MultipleFaces,
    Looking(HeadDirection),
}

/// Per-frame face analysis result
#[derive(Debug, Clone, Default)]
pub struct FaceObservation {
    /// Number of faces above the confidence threshold
    pub faces: usize,
    /// Head direction of the primary face
    pub direction: HeadDirection,
    /// Gaze direction of the primary face
    pub gaze: GazeDirection,
    /// Event hint for this frame, if any. Derived from the same count and
    /// direction, so debounced consumers only trace it.
    pub event: Option<FaceEvent>,
    /// Crop of the primary face (for embedding)
    pub face_crop: Option<VideoFrame>,
}

/// Result of a face extraction (used by enrollment)
#[derive(Debug, Clone, Default)]
pub struct FaceExtraction {
    pub crop: Option<VideoFrame>,
    pub face_count: usize,
    pub landmarks: Option<FaceLandmarks>,
}

/// Face analysis on top of a landmark detector
#[derive(Clone)]
pub struct FaceAnalyzer {
    detector: Arc<dyn FaceDetector>,
    thresholds: DirectionThresholds,
}

impl FaceAnalyzer {
    pub fn new(detector: Arc<dyn FaceDetector>, thresholds: DirectionThresholds) -> Self {
        Self {
            detector,
            thresholds,
        }
    }

    /// Count faces and classify the primary face's head and gaze direction
    pub fn analyze(&self, frame: &VideoFrame) -> Result<FaceObservation, DetectionError> {
        let faces = self.detector.detect_faces(frame)?;

        let Some(primary) = primary_face(&faces) else {
            return Ok(FaceObservation {
                event: Some(FaceEvent::NoFace),
                ..Default::default()
            });
        };

        let direction = classify_head(&primary.landmarks, &self.thresholds);
        let gaze = classify_gaze(&primary.landmarks, &self.thresholds);

        let event = if faces.len() > 1 {
            Some(FaceEvent::MultipleFaces)
        } else if direction != HeadDirection::Center {
            Some(FaceEvent::Looking(direction))
        } else {
            None
        };

        Ok(FaceObservation {
            faces: faces.len(),
            direction,
            gaze,
            event,
            face_crop: crop_face(frame, &primary.bbox),
        })
    }

    /// Crop the primary face and report how many faces were seen
    pub fn extract_face(&self, frame: &VideoFrame) -> Result<FaceExtraction, DetectionError> {
        let faces = self.detector.detect_faces(frame)?;
        let primary = primary_face(&faces);

        Ok(FaceExtraction {
            crop: primary.and_then(|f| crop_face(frame, &f.bbox)),
            face_count: faces.len(),
            landmarks: primary.map(|f| f.landmarks.clone()),
        })
    }
}

fn primary_face(faces: &[DetectedFace]) -> Option<&DetectedFace> {
    faces
        .iter()
        .max_by(|a, b| a.bbox.confidence.total_cmp(&b.bbox.confidence))
}

fn crop_face(frame: &VideoFrame, bbox: &FaceBbox) -> Option<VideoFrame> {
    frame.crop_clamped(bbox.x, bbox.y, bbox.width, bbox.height)
}

/// Classify head direction from the nose position relative to eyes and mouth.
///
/// Yaw wins over pitch when both exceed their thresholds.
pub fn classify_head(landmarks: &FaceLandmarks, thresholds: &DirectionThresholds) -> HeadDirection {
    let inter_ocular = landmarks.left_eye.distance(landmarks.right_eye);
    if inter_ocular < EPSILON {
        return HeadDirection::Center;
    }

    let eye_mid = landmarks.left_eye.midpoint(landmarks.right_eye);

    // Candidate turning to their left moves the nose toward image right
    let yaw = (landmarks.nose.x - eye_mid.x) / inter_ocular;
    if yaw > thresholds.head_yaw_ratio {
        return HeadDirection::Left;
    }
    if yaw < -thresholds.head_yaw_ratio {
        return HeadDirection::Right;
    }

    let span = landmarks.mouth.y - eye_mid.y;
    if span < EPSILON {
        return HeadDirection::Center;
    }

    let pitch = (landmarks.nose.y - eye_mid.y) / span;
    if pitch < thresholds.head_pitch_up_ratio {
        HeadDirection::Up
    } else if pitch > thresholds.head_pitch_down_ratio {
        HeadDirection::Down
    } else {
        HeadDirection::Center
    }
}

/// Classify gaze from the mean iris offset against the eye centers.
///
/// Without both irises there is no gaze determination and `Center` is returned.
pub fn classify_gaze(landmarks: &FaceLandmarks, thresholds: &DirectionThresholds) -> GazeDirection {
    let (Some(left_iris), Some(right_iris)) = (landmarks.left_iris, landmarks.right_iris) else {
        return GazeDirection::Center;
    };

    let inter_ocular = landmarks.left_eye.distance(landmarks.right_eye);
    if inter_ocular < EPSILON {
        return GazeDirection::Center;
    }

    let dx = ((left_iris.x - landmarks.left_eye.x) + (right_iris.x - landmarks.right_eye.x))
        / 2.0
        / inter_ocular;
    let dy = ((left_iris.y - landmarks.left_eye.y) + (right_iris.y - landmarks.right_eye.y))
        / 2.0
        / inter_ocular;

    if dx > thresholds.gaze_horizontal_ratio {
        GazeDirection::Left
    } else if dx < -thresholds.gaze_horizontal_ratio {
        GazeDirection::Right
    } else if dy < -thresholds.gaze_vertical_ratio {
        GazeDirection::Up
    } else if dy > thresholds.gaze_vertical_ratio {
        GazeDirection::Down
    } else {
        GazeDirection::Center
    }
}
