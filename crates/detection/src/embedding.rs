//! Face embeddings and distance metric

use serde::{Deserialize, Serialize};

/// Face embedding vector (Facenet-style, typically 512-dim)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceEmbedding {
    pub vector: Vec<f32>,
}

impl FaceEmbedding {
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector }
    }

    /// Cosine distance to another embedding, `None` when not comparable
    pub fn distance(&self, other: &FaceEmbedding) -> Option<f32> {
        cosine_distance(&self.vector, &other.vector)
    }

    /// Whether the vector carries any signal (finite and not all zeros)
    pub fn is_usable(&self) -> bool {
        !self.vector.is_empty()
            && self.vector.iter().all(|v| v.is_finite())
            && self.vector.iter().any(|v| *v != 0.0)
    }
}

/// Cosine distance `1 - cos(a, b)`, in `[0, 2]`, smaller is more similar.
///
/// Returns `None` for vectors of different length or with zero norm.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a > 0.0 && norm_b > 0.0 {
        Some((1.0 - dot / (norm_a * norm_b)).clamp(0.0, 2.0))
    } else {
        None
    }
}
