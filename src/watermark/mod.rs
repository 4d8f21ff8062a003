//! Watermark engine: settings, placement math and compositing.
//!
//! Renders a single watermark layer (text or image) over a base image,
//! either once at one of nine anchors or tiled across the whole canvas in a
//! brick pattern. Rendering is deterministic and never fails: missing or
//! empty content simply leaves the base untouched.
//!
//! # Features
//!
//! - **Text watermarks** drawn as glyph outlines from an embedded bold font
//! - **Image watermarks** scaled relative to the base width
//! - **9-grid anchors** with a proportional edge inset
//! - **Tiled mode** with rotation-safe overscan and a tile cap
//! - **Copy-on-update settings** so every change yields a new snapshot
//!
//! # Settings Example
//!
//! ```yaml
//! watermark:
//!   kind: text
//!   text: "© Watermark"
//!   color: "#FFFFFF"
//!   opacity: 0.8
//!   font_size: 5
//!   rotation: -30
//!   tiled: true
//!   gap: 20
//! ```

pub mod compositor;
pub mod error;
pub mod image_io;
pub mod position;
pub mod settings;
pub mod surface;
pub mod text_renderer;

// Re-export main types for convenience
pub use compositor::{Compositor, RenderMode, RenderReport};
pub use error::WatermarkError;
pub use image_io::{decode_image, encode_png, export_file_name, load_image, ImageLimits};
pub use position::{
    alignment_offset, anchor_point, centered_offset, inset, ImageDimensions, PlacementPoint,
    TileGrid, TilePlacement, TilePolicy, WatermarkDimensions,
};
pub use settings::{Anchor, HorizontalAlign, VerticalAlign, WatermarkKind, WatermarkSettings};
pub use surface::{DrawScope, ImagePaint, RenderTarget, TextPaint};
pub use text_renderer::{
    layout_text, measure_text, parse_hex_color, Color, PlacedGlyph, TextLayout, TextMetrics,
};
