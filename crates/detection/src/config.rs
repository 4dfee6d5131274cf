//! Detection configuration

use serde::{Deserialize, Serialize};

/// Landmark ratios used to classify head and gaze direction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionThresholds {
    /// Horizontal nose offset from the eye midpoint, as a fraction of the
    /// inter-ocular distance, beyond which the head counts as turned
    pub head_yaw_ratio: f32,

    /// Nose position between eye line (0.0) and mouth (1.0) below which the
    /// head counts as tilted up
    pub head_pitch_up_ratio: f32,

    /// Nose position between eye line and mouth above which the head counts
    /// as tilted down
    pub head_pitch_down_ratio: f32,

    /// Mean horizontal iris offset (fraction of inter-ocular distance)
    pub gaze_horizontal_ratio: f32,

    /// Mean vertical iris offset (fraction of inter-ocular distance)
    pub gaze_vertical_ratio: f32,
}

impl Default for DirectionThresholds {
    fn default() -> Self {
        Self {
            head_yaw_ratio: 0.22,
            head_pitch_up_ratio: 0.3,
            head_pitch_down_ratio: 0.75,
            gaze_horizontal_ratio: 0.09,
            gaze_vertical_ratio: 0.07,
        }
    }
}

/// Detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Face detection confidence threshold
    pub face_confidence: f32,

    /// Phone detection confidence threshold
    pub phone_confidence: f32,

    /// COCO class id of "cell phone" in the object detector
    pub phone_class_id: usize,

    /// Number of classes the object detector was trained on
    pub object_classes: usize,

    /// Square input size of the face detector
    pub face_input_size: u32,

    /// Square input size of the object detector
    pub phone_input_size: u32,

    /// Square input size of the embedding model
    pub embedding_input_size: u32,

    /// Direction classification ratios
    pub thresholds: DirectionThresholds,

    /// Model paths
    pub face_model_path: Option<String>,
    pub phone_model_path: Option<String>,
    pub embedding_model_path: Option<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            face_confidence: 0.7,
            phone_confidence: 0.45,
            phone_class_id: 67,
            object_classes: 80,
            face_input_size: 320,
            phone_input_size: 640,
            embedding_input_size: 160,
            thresholds: DirectionThresholds::default(),
            face_model_path: None,
            phone_model_path: None,
            embedding_model_path: None,
        }
    }
}
