//! Snapshot payload decoding

use base64::Engine;
use tracing::debug;

use crate::{CaptureError, VideoFrame};

/// Decode a browser snapshot into an RGB frame.
///
/// Accepts either a data URL (`data:image/jpeg;base64,<payload>`) or a bare
/// base64 string. Whitespace inside the payload is ignored.
pub fn decode_data_url(payload: &str) -> Result<VideoFrame, CaptureError> {
    let encoded = match payload.split_once(',') {
        Some((header, body)) if header.starts_with("data:") => body,
        _ => payload,
    };

    let cleaned: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(CaptureError::EmptyPayload);
    }

    let bytes = base64::engine::general_purpose::STANDARD.decode(cleaned.as_bytes())?;
    decode_image_bytes(&bytes)
}

/// Decode encoded image bytes (format is sniffed from the content)
pub fn decode_image_bytes(bytes: &[u8]) -> Result<VideoFrame, CaptureError> {
    if bytes.is_empty() {
        return Err(CaptureError::EmptyPayload);
    }

    let img = image::load_from_memory(bytes)?;
    let rgb = img.to_rgb8();
    debug!("Decoded snapshot {}x{}", rgb.width(), rgb.height());

    Ok(VideoFrame::from_rgb_image(rgb))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png_base64(width: u32, height: u32) -> String {
        let img = RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_decode_data_url() {
        let url = format!("data:image/png;base64,{}", png_base64(4, 3));
        let frame = decode_data_url(&url).unwrap();
        assert_eq!((frame.width, frame.height), (4, 3));
        assert_eq!(frame.get_pixel(1, 1), Some([10, 20, 30]));
    }

    #[test]
    fn test_decode_bare_base64() {
        let frame = decode_data_url(&png_base64(2, 2)).unwrap();
        assert_eq!(frame.data.len(), 12);
    }

    #[test]
    fn test_empty_payload() {
        assert!(matches!(
            decode_data_url("data:image/png;base64,"),
            Err(CaptureError::EmptyPayload)
        ));
    }

    #[test]
    fn test_invalid_base64() {
        assert!(matches!(
            decode_data_url("data:image/png;base64,@@@"),
            Err(CaptureError::Base64(_))
        ));
    }

    #[test]
    fn test_not_an_image() {
        let payload = base64::engine::general_purpose::STANDARD.encode(b"definitely not a jpeg");
        assert!(matches!(decode_data_url(&payload), Err(CaptureError::Image(_))));
    }
}
