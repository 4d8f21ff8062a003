//! Watermark settings model.
//!
//! `WatermarkSettings` is a plain value: the engine reads it for one render
//! and never mutates it. Every change goes through a `with_*` method that
//! returns a new value with a single field replaced, so a render always sees
//! a consistent snapshot.
//!
//! Settings can be loaded from YAML/JSON as initial defaults:
//!
//! ```yaml
//! watermark:
//!   kind: text
//!   text: "© Watermark"
//!   color: "#ffffff"
//!   opacity: 0.8
//!   font_size: 5
//!   rotation: -30
//!   tiled: true
//!   gap: 20
//! ```

use super::text_renderer::Color;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Which content the watermark layer renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkKind {
    #[default]
    Text,
    Image,
}

impl FromStr for WatermarkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            other => Err(format!("unknown watermark kind '{}'", other)),
        }
    }
}

/// Horizontal component of an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

/// Vertical component of an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Top,
    Middle,
    Bottom,
}

/// One of the nine single-position anchors (3 vertical x 3 horizontal).
///
/// Serialized as the two-letter id: vertical letter first (`t`, `c`, `b`),
/// horizontal letter second (`l`, `c`, `r`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Anchor {
    #[serde(rename = "tl")]
    TopLeft,
    #[serde(rename = "tc")]
    TopCenter,
    #[serde(rename = "tr")]
    TopRight,
    #[serde(rename = "cl")]
    CenterLeft,
    #[serde(rename = "cc")]
    Center,
    #[serde(rename = "cr")]
    CenterRight,
    #[serde(rename = "bl")]
    BottomLeft,
    #[serde(rename = "bc")]
    BottomCenter,
    #[default]
    #[serde(rename = "br")]
    BottomRight,
}

impl Anchor {
    /// All anchors in reading order.
    pub const ALL: [Anchor; 9] = [
        Anchor::TopLeft,
        Anchor::TopCenter,
        Anchor::TopRight,
        Anchor::CenterLeft,
        Anchor::Center,
        Anchor::CenterRight,
        Anchor::BottomLeft,
        Anchor::BottomCenter,
        Anchor::BottomRight,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Self::TopLeft => "tl",
            Self::TopCenter => "tc",
            Self::TopRight => "tr",
            Self::CenterLeft => "cl",
            Self::Center => "cc",
            Self::CenterRight => "cr",
            Self::BottomLeft => "bl",
            Self::BottomCenter => "bc",
            Self::BottomRight => "br",
        }
    }

    pub fn horizontal(&self) -> HorizontalAlign {
        match self {
            Self::TopLeft | Self::CenterLeft | Self::BottomLeft => HorizontalAlign::Left,
            Self::TopCenter | Self::Center | Self::BottomCenter => HorizontalAlign::Center,
            Self::TopRight | Self::CenterRight | Self::BottomRight => HorizontalAlign::Right,
        }
    }

    pub fn vertical(&self) -> VerticalAlign {
        match self {
            Self::TopLeft | Self::TopCenter | Self::TopRight => VerticalAlign::Top,
            Self::CenterLeft | Self::Center | Self::CenterRight => VerticalAlign::Middle,
            Self::BottomLeft | Self::BottomCenter | Self::BottomRight => VerticalAlign::Bottom,
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Anchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|anchor| anchor.id() == s.to_ascii_lowercase())
            .ok_or_else(|| {
                format!(
                    "unknown anchor '{}', expected one of tl, tc, tr, cl, cc, cr, bl, bc, br",
                    s
                )
            })
    }
}

fn default_text() -> String {
    "© Watermark".to_string()
}

fn default_image_scale() -> f32 {
    15.0
}

fn default_opacity() -> f32 {
    0.8
}

fn default_font_size() -> f32 {
    5.0
}

fn default_gap() -> f32 {
    20.0
}

/// Complete watermark configuration for one render.
#[derive(Clone, Serialize, Deserialize)]
pub struct WatermarkSettings {
    /// Which content is active
    #[serde(default)]
    pub kind: WatermarkKind,

    /// Watermark text (text kind only)
    #[serde(default = "default_text")]
    pub text: String,

    /// Decoded watermark image (image kind only); never serialized
    #[serde(skip)]
    pub watermark_image: Option<Arc<RgbaImage>>,

    /// Drawn image width as a percentage of the base width, 1-100
    #[serde(default = "default_image_scale")]
    pub image_scale: f32,

    /// Text fill color
    #[serde(default = "Color::white")]
    pub color: Color,

    /// Global alpha for the watermark layer, (0, 1]
    #[serde(default = "default_opacity")]
    pub opacity: f32,

    /// Glyph height as a percentage of the base width, 1-30
    #[serde(default = "default_font_size")]
    pub font_size: f32,

    /// Clockwise rotation in degrees, -180..=180
    #[serde(default)]
    pub rotation: i32,

    /// Repeat the watermark across the whole image
    #[serde(default)]
    pub tiled: bool,

    /// Single-position anchor (ignored when tiled)
    #[serde(default)]
    pub anchor: Anchor,

    /// Tile spacing in base-width units, 0-100
    #[serde(default = "default_gap")]
    pub gap: f32,
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        Self {
            kind: WatermarkKind::Text,
            text: default_text(),
            watermark_image: None,
            image_scale: default_image_scale(),
            color: Color::white(),
            opacity: default_opacity(),
            font_size: default_font_size(),
            rotation: 0,
            tiled: false,
            anchor: Anchor::BottomRight,
            gap: default_gap(),
        }
    }
}

impl fmt::Debug for WatermarkSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatermarkSettings")
            .field("kind", &self.kind)
            .field("text", &self.text)
            .field(
                "watermark_image",
                &self
                    .watermark_image
                    .as_ref()
                    .map(|img| (img.width(), img.height())),
            )
            .field("image_scale", &self.image_scale)
            .field("color", &self.color)
            .field("opacity", &self.opacity)
            .field("font_size", &self.font_size)
            .field("rotation", &self.rotation)
            .field("tiled", &self.tiled)
            .field("anchor", &self.anchor)
            .field("gap", &self.gap)
            .finish()
    }
}

impl WatermarkSettings {
    fn replace(&self, update: impl FnOnce(&mut Self)) -> Self {
        let mut next = self.clone();
        update(&mut next);
        next
    }

    pub fn with_kind(&self, kind: WatermarkKind) -> Self {
        self.replace(|s| s.kind = kind)
    }

    pub fn with_text(&self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.replace(|s| s.text = text)
    }

    pub fn with_watermark_image(&self, image: impl Into<Arc<RgbaImage>>) -> Self {
        let image = image.into();
        self.replace(|s| s.watermark_image = Some(image))
    }

    pub fn without_watermark_image(&self) -> Self {
        self.replace(|s| s.watermark_image = None)
    }

    pub fn with_image_scale(&self, image_scale: f32) -> Self {
        self.replace(|s| s.image_scale = image_scale)
    }

    pub fn with_color(&self, color: Color) -> Self {
        self.replace(|s| s.color = color)
    }

    pub fn with_opacity(&self, opacity: f32) -> Self {
        self.replace(|s| s.opacity = opacity)
    }

    pub fn with_font_size(&self, font_size: f32) -> Self {
        self.replace(|s| s.font_size = font_size)
    }

    pub fn with_rotation(&self, rotation: i32) -> Self {
        self.replace(|s| s.rotation = rotation)
    }

    pub fn with_tiled(&self, tiled: bool) -> Self {
        self.replace(|s| s.tiled = tiled)
    }

    pub fn with_anchor(&self, anchor: Anchor) -> Self {
        self.replace(|s| s.anchor = anchor)
    }

    pub fn with_gap(&self, gap: f32) -> Self {
        self.replace(|s| s.gap = gap)
    }

    /// Check every field against its documented range.
    ///
    /// The engine does not call this; out-of-range values render as
    /// geometrically defined (possibly degenerate) output. Callers that
    /// accept free-form input (config files, CLI flags) use it to reject
    /// values a slider would never produce.
    pub fn validate(&self) -> Result<(), String> {
        check_range("image_scale", self.image_scale, 1.0, 100.0)?;
        check_range("font_size", self.font_size, 1.0, 30.0)?;
        check_range("gap", self.gap, 0.0, 100.0)?;

        if !self.opacity.is_finite() || self.opacity <= 0.0 || self.opacity > 1.0 {
            return Err(format!(
                "opacity must be a finite value in (0.0, 1.0], got {}",
                self.opacity
            ));
        }

        if !(-180..=180).contains(&self.rotation) {
            return Err(format!(
                "rotation must be between -180 and 180 degrees, got {}",
                self.rotation
            ));
        }

        Ok(())
    }
}

fn check_range(name: &str, value: f32, min: f32, max: f32) -> Result<(), String> {
    if !value.is_finite() || value < min || value > max {
        return Err(format!(
            "{} must be a finite value between {} and {}, got {}",
            name, min, max, value
        ));
    }
    Ok(())
}
