//! Frame Capture Library for Exam Proctoring
//!
//! Turns the webcam snapshots posted by the exam client into RGB frames.
//! Supports:
//! - Base64 data URLs (`data:image/jpeg;base64,...`) as produced by a browser canvas
//! - Bare base64 payloads
//! - Any still-image format the `image` crate can sniff (JPEG, PNG, WebP, ...)

pub mod decode;
pub mod frame;

pub use decode::{decode_data_url, decode_image_bytes};
pub use frame::VideoFrame;

use thiserror::Error;

/// Frame capture error types
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Empty image payload")]
    EmptyPayload,

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid frame dimensions {width}x{height}")]
    Dimensions { width: u32, height: u32 },
}
