//! Image decoding and encoding at the edges of the engine.
//!
//! Base and watermark images arrive as raw bytes (a file on disk for the
//! CLI). They are sniffed by magic bytes, restricted to PNG, JPEG and WebP,
//! and checked against size limits before full decoding to guard against
//! image bombs. Output is always PNG.

use super::WatermarkError;
use chrono::{DateTime, Utc};
use image::io::Reader as ImageReader;
use image::{ImageFormat, ImageOutputFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;

/// Upper bounds applied to every decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageLimits {
    /// Maximum encoded size in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Maximum width * height
    #[serde(default = "default_max_pixels")]
    pub max_pixels: u64,
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024 // 50MB
}

fn default_max_pixels() -> u64 {
    100_000_000 // 100 megapixels
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            max_pixels: default_max_pixels(),
        }
    }
}

impl ImageLimits {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_file_size == 0 {
            return Err("limits max_file_size must be greater than 0".to_string());
        }
        if self.max_pixels == 0 {
            return Err("limits max_pixels must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Detect a supported image format from magic bytes.
pub fn detect_format(data: &[u8]) -> Result<ImageFormat, WatermarkError> {
    let format = image::guess_format(data)
        .map_err(|e| WatermarkError::DecodeError(format!("Unrecognized image data: {}", e)))?;

    match format {
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP => Ok(format),
        other => Err(WatermarkError::DecodeError(format!(
            "Unsupported image format: {:?}",
            other
        ))),
    }
}

/// Decode PNG, JPEG or WebP bytes into RGBA pixels.
pub fn decode_image(data: &[u8], limits: &ImageLimits) -> Result<RgbaImage, WatermarkError> {
    if data.len() as u64 > limits.max_file_size {
        return Err(WatermarkError::LimitExceeded(format!(
            "{} bytes exceeds maximum of {} bytes",
            data.len(),
            limits.max_file_size
        )));
    }

    let format = detect_format(data)?;

    let (width, height) = ImageReader::with_format(Cursor::new(data), format)
        .into_dimensions()
        .map_err(|e| WatermarkError::DecodeError(e.to_string()))?;

    let pixels = width as u64 * height as u64;
    if pixels > limits.max_pixels {
        return Err(WatermarkError::LimitExceeded(format!(
            "{}x{} ({} pixels) exceeds maximum of {} pixels",
            width, height, pixels, limits.max_pixels
        )));
    }
    if pixels == 0 {
        return Err(WatermarkError::DecodeError(
            "Image has zero width or height".to_string(),
        ));
    }

    let image = ImageReader::with_format(Cursor::new(data), format)
        .decode()
        .map_err(|e| WatermarkError::DecodeError(e.to_string()))?;

    tracing::debug!(?format, width, height, "Decoded image");

    Ok(image.to_rgba8())
}

/// Read and decode an image file.
pub fn load_image(path: impl AsRef<Path>, limits: &ImageLimits) -> Result<RgbaImage, WatermarkError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| {
        WatermarkError::DecodeError(format!("Failed to read {}: {}", path.display(), e))
    })?;
    decode_image(&data, limits)
}

/// Encode pixels as PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, WatermarkError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageOutputFormat::Png)
        .map_err(|e| WatermarkError::EncodeError(e.to_string()))?;
    Ok(buffer.into_inner())
}

/// Download file name for a rendered image: `watermarked-<unix-ms>.png`.
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("watermarked-{}.png", now.timestamp_millis())
}
