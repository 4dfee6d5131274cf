//! Video frame types and processing

use image::{imageops, ImageBuffer, Rgb, RgbImage};

use crate::CaptureError;

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self, CaptureError> {
        if width == 0 || height == 0 || data.len() != (width as usize) * (height as usize) * 3 {
            return Err(CaptureError::Dimensions { width, height });
        }
        Ok(Self { data, width, height })
    }

    /// Wrap an already decoded RGB image
    pub fn from_rgb_image(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            data: img.into_raw(),
            width,
            height,
        }
    }

    /// Borrow the pixel data as an `image` buffer
    pub fn as_rgb_image(&self) -> Option<ImageBuffer<Rgb<u8>, &[u8]>> {
        ImageBuffer::from_raw(self.width, self.height, self.data.as_slice())
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    /// Crop a region of the frame
    pub fn crop(&self, x: u32, y: u32, w: u32, h: u32) -> Option<VideoFrame> {
        if w == 0 || h == 0 || x + w > self.width || y + h > self.height {
            return None;
        }

        let mut cropped = Vec::with_capacity((w * h * 3) as usize);
        for row in y..(y + h) {
            let start = ((row * self.width + x) * 3) as usize;
            let end = start + (w * 3) as usize;
            cropped.extend_from_slice(&self.data[start..end]);
        }

        Some(VideoFrame {
            data: cropped,
            width: w,
            height: h,
        })
    }

    /// Crop a floating-point box, clamped to the frame bounds.
    ///
    /// Detector boxes routinely overhang the image edge by a few pixels, so the
    /// box is intersected with the frame rather than rejected.
    pub fn crop_clamped(&self, x: f32, y: f32, w: f32, h: f32) -> Option<VideoFrame> {
        let x0 = x.max(0.0).floor() as u32;
        let y0 = y.max(0.0).floor() as u32;
        let x1 = ((x + w).ceil().max(0.0) as u32).min(self.width);
        let y1 = ((y + h).ceil().max(0.0) as u32).min(self.height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        self.crop(x0, y0, x1 - x0, y1 - y0)
    }

    /// Resize to the given dimensions (triangle filter)
    pub fn resize(&self, new_width: u32, new_height: u32) -> Option<RgbImage> {
        let img = self.as_rgb_image()?;
        Some(imageops::resize(
            &img,
            new_width,
            new_height,
            imageops::FilterType::Triangle,
        ))
    }
}
