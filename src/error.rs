// Error types module

use std::fmt;

use crate::suggest::SuggestError;
use crate::watermark::WatermarkError;

/// Top-level error type for the application
///
/// Wraps the errors of each subsystem so the CLI can report them
/// uniformly.
#[derive(Debug)]
pub enum AppError {
    /// Configuration errors (invalid YAML, missing env vars, bad values)
    Config(String),

    /// Image decoding, encoding or watermark settings errors
    Image(WatermarkError),

    /// Suggestion service errors (only `Busy` reaches callers in practice)
    Suggest(SuggestError),

    /// Filesystem errors
    Io(std::io::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Image(e) => write!(f, "Image error: {}", e),
            AppError::Suggest(e) => write!(f, "Suggestion error: {}", e),
            AppError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(_) => None,
            AppError::Image(e) => Some(e),
            AppError::Suggest(e) => Some(e),
            AppError::Io(e) => Some(e),
        }
    }
}

impl From<WatermarkError> for AppError {
    fn from(err: WatermarkError) -> Self {
        AppError::Image(err)
    }
}

impl From<SuggestError> for AppError {
    fn from(err: SuggestError) -> Self {
        AppError::Suggest(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err)
    }
}
