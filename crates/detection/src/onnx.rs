//! ONNX Runtime backed detectors

use frame_capture::VideoFrame;
use image::RgbImage;
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use tracing::{debug, error, info};

use crate::{
    DetectedFace, DetectionConfig, DetectionError, FaceBbox, FaceDetector, FaceEmbedder,
    FaceEmbedding, FaceLandmarks, PhoneDetector, Point,
};

/// Values per face row: bbox (4), score (1), 8 keypoints (16)
const FACE_ROW_LEN: usize = 21;

fn load_session(path: &str, what: &str) -> Result<Session, DetectionError> {
    info!("Loading {} model from {}", what, path);
    Session::builder()
        .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
        .and_then(|builder| builder.commit_from_file(path))
        .map_err(|e| {
            error!("Failed to load {} model: {}", what, e);
            DetectionError::ModelLoad(e.to_string())
        })
}

/// Resize a frame and lay it out as a 1x3xSxS tensor
fn to_nchw(
    frame: &VideoFrame,
    size: u32,
    normalize: impl Fn(u8) -> f32,
) -> Result<Array4<f32>, DetectionError> {
    let resized: RgbImage = frame
        .resize(size, size)
        .ok_or_else(|| DetectionError::ImageProcessing("Failed to create image buffer".into()))?;

    let side = size as usize;
    let mut input = Array4::<f32>::zeros((1, 3, side, side));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            input[[0, c, y as usize, x as usize]] = normalize(pixel[c]);
        }
    }
    Ok(input)
}

/// Run a single-input model and flatten its first output
fn run_flat(session: &Session, input: Array4<f32>) -> Result<Vec<f32>, DetectionError> {
    let outputs = session
        .run(ort::inputs![input].map_err(|e| DetectionError::Inference(e.to_string()))?)
        .map_err(|e| DetectionError::Inference(e.to_string()))?;

    let tensor = outputs[0]
        .try_extract_tensor::<f32>()
        .map_err(|e| DetectionError::OutputShape(e.to_string()))?;

    Ok(tensor.iter().copied().collect())
}

/// Face detector with landmarks.
///
/// Expects a post-NMS output of `N x 21` rows with coordinates normalized to
/// `[0, 1]`: `x, y, w, h, score`, then left eye, right eye, nose, mouth, left
/// ear, right ear, left iris, right iris. Negative iris coordinates mean the
/// iris was not located.
pub struct OnnxFaceDetector {
    session: Session,
    input_size: u32,
    confidence_threshold: f32,
}

impl OnnxFaceDetector {
    pub fn new(path: &str, config: &DetectionConfig) -> Result<Self, DetectionError> {
        Ok(Self {
            session: load_session(path, "face detection")?,
            input_size: config.face_input_size,
            confidence_threshold: config.face_confidence,
        })
    }
}

impl FaceDetector for OnnxFaceDetector {
    fn detect_faces(&self, frame: &VideoFrame) -> Result<Vec<DetectedFace>, DetectionError> {
        let input = to_nchw(frame, self.input_size, |v| v as f32 / 255.0)?;
        let flat = run_flat(&self.session, input)?;

        if flat.len() % FACE_ROW_LEN != 0 {
            return Err(DetectionError::OutputShape(format!(
                "face output length {} is not a multiple of {}",
                flat.len(),
                FACE_ROW_LEN
            )));
        }

        let (w, h) = (frame.width as f32, frame.height as f32);
        let point = |row: &[f32], i: usize| Point::new(row[5 + i * 2] * w, row[6 + i * 2] * h);
        let iris = |row: &[f32], i: usize| {
            (row[5 + i * 2] >= 0.0 && row[6 + i * 2] >= 0.0).then(|| point(row, i))
        };

        let mut faces: Vec<DetectedFace> = flat
            .chunks_exact(FACE_ROW_LEN)
            .filter(|row| row[4] >= self.confidence_threshold)
            .map(|row| DetectedFace {
                bbox: FaceBbox {
                    x: row[0] * w,
                    y: row[1] * h,
                    width: row[2] * w,
                    height: row[3] * h,
                    confidence: row[4],
                },
                landmarks: FaceLandmarks {
                    left_eye: point(row, 0),
                    right_eye: point(row, 1),
                    nose: point(row, 2),
                    mouth: point(row, 3),
                    left_iris: iris(row, 6),
                    right_iris: iris(row, 7),
                },
            })
            .collect();

        faces.sort_by(|a, b| b.bbox.confidence.total_cmp(&a.bbox.confidence));
        debug!("Face detector found {} faces", faces.len());
        Ok(faces)
    }
}

/// YOLO-style object detector used for phones.
///
/// Output layout is `1 x (4 + classes) x anchors`; only the phone class row is read.
pub struct OnnxPhoneDetector {
    session: Session,
    input_size: u32,
    confidence_threshold: f32,
    phone_class_id: usize,
    classes: usize,
}

impl OnnxPhoneDetector {
    pub fn new(path: &str, config: &DetectionConfig) -> Result<Self, DetectionError> {
        Ok(Self {
            session: load_session(path, "object detection")?,
            input_size: config.phone_input_size,
            confidence_threshold: config.phone_confidence,
            phone_class_id: config.phone_class_id,
            classes: config.object_classes,
        })
    }
}

impl PhoneDetector for OnnxPhoneDetector {
    fn detect_phone(&self, frame: &VideoFrame) -> Result<bool, DetectionError> {
        let input = to_nchw(frame, self.input_size, |v| v as f32 / 255.0)?;
        let flat = run_flat(&self.session, input)?;

        let rows = 4 + self.classes;
        if flat.is_empty() || flat.len() % rows != 0 || self.phone_class_id >= self.classes {
            return Err(DetectionError::OutputShape(format!(
                "object output length {} does not fit {} rows",
                flat.len(),
                rows
            )));
        }

        let anchors = flat.len() / rows;
        let start = (4 + self.phone_class_id) * anchors;
        let best = flat[start..start + anchors]
            .iter()
            .copied()
            .fold(0.0f32, f32::max);

        debug!("Phone confidence {:.3}", best);
        Ok(best >= self.confidence_threshold)
    }
}

/// Facenet-style embedding model
pub struct OnnxFaceEmbedder {
    session: Session,
    input_size: u32,
}

impl OnnxFaceEmbedder {
    pub fn new(path: &str, config: &DetectionConfig) -> Result<Self, DetectionError> {
        Ok(Self {
            session: load_session(path, "face embedding")?,
            input_size: config.embedding_input_size,
        })
    }
}

impl FaceEmbedder for OnnxFaceEmbedder {
    fn embed(&self, face_crop: &VideoFrame) -> Result<Option<FaceEmbedding>, DetectionError> {
        let input = to_nchw(face_crop, self.input_size, |v| (v as f32 - 127.5) / 128.0)?;
        let embedding = FaceEmbedding::new(run_flat(&self.session, input)?);

        if embedding.is_usable() {
            Ok(Some(embedding))
        } else {
            debug!("Embedding model returned an empty vector");
            Ok(None)
        }
    }
}
