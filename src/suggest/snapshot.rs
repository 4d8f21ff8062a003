//! Downscaled JPEG snapshot of the base image for the model request.

use super::SuggestError;
use base64::{engine::general_purpose::STANDARD, Engine};
use image::imageops::FilterType;
use image::{DynamicImage, ImageOutputFormat, RgbaImage};
use std::io::Cursor;

/// Base64-encoded JPEG ready to inline into a request.
#[derive(Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub width: u32,
    pub height: u32,
    pub data: String,
}

impl Snapshot {
    pub const MIME_TYPE: &'static str = "image/jpeg";
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// Fit `(width, height)` inside `max_edge` on the longest side, never upscaling.
pub fn fit_dimensions(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_edge || longest == 0 {
        return (width, height);
    }

    let ratio = max_edge as f64 / longest as f64;
    let w = ((width as f64 * ratio).round() as u32).max(1);
    let h = ((height as f64 * ratio).round() as u32).max(1);
    (w, h)
}

/// Downscale and JPEG-encode `image`.
pub fn prepare(image: &RgbaImage, max_edge: u32, quality: u8) -> Result<Snapshot, SuggestError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(SuggestError::Snapshot("image is empty".to_string()));
    }

    let (width, height) = fit_dimensions(image.width(), image.height(), max_edge.max(1));
    let scaled = if (width, height) == image.dimensions() {
        DynamicImage::ImageRgba8(image.clone())
    } else {
        DynamicImage::ImageRgba8(image::imageops::resize(
            image,
            width,
            height,
            FilterType::Lanczos3,
        ))
    };

    let mut buffer = Cursor::new(Vec::new());
    scaled
        .to_rgb8()
        .write_to(&mut buffer, ImageOutputFormat::Jpeg(quality.clamp(1, 100)))
        .map_err(|e| SuggestError::Snapshot(e.to_string()))?;

    Ok(Snapshot {
        width,
        height,
        data: STANDARD.encode(buffer.into_inner()),
    })
}
