// Inkstamp watermark library

pub mod config;
pub mod error;
pub mod logging;
pub mod suggest; // Watermark text suggestions
pub mod watermark;
