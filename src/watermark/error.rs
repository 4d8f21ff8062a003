//! Watermark error types.
//!
//! Defines errors that can occur around the compositing engine: decoding
//! user images, encoding the output, loading the font and validating
//! settings. The engine itself never fails; these surface from the I/O
//! and configuration edges.

use std::fmt;

/// Errors that can occur during watermark processing.
#[derive(Debug)]
pub enum WatermarkError {
    /// Failed to decode a base or watermark image
    DecodeError(String),

    /// Failed to encode the composited output
    EncodeError(String),

    /// Failed to render text watermark
    RenderError(String),

    /// Invalid settings or configuration
    ConfigError(String),

    /// Input exceeds the configured size limits
    LimitExceeded(String),
}

impl fmt::Display for WatermarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DecodeError(msg) => write!(f, "Failed to decode image: {}", msg),
            Self::EncodeError(msg) => write!(f, "Failed to encode image: {}", msg),
            Self::RenderError(msg) => write!(f, "Failed to render text watermark: {}", msg),
            Self::ConfigError(msg) => write!(f, "Watermark configuration error: {}", msg),
            Self::LimitExceeded(msg) => write!(f, "Image exceeds limits: {}", msg),
        }
    }
}

impl std::error::Error for WatermarkError {}
