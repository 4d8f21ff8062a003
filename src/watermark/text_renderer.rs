//! Text watermark rendering.
//!
//! This module lays watermark text out as positioned glyphs. The glyphs are
//! filled as outlines under the instance transform by the render target, so
//! rotated text is rasterized at its final orientation.
//!
//! Sizes are em sizes in pixels, the same unit as a CSS `font-size`.
//!
//! # Features
//!
//! - Hex color parsing (#RGB, #RRGGBB and #RRGGBBAA formats)
//! - Text measurement and layout with kerning
//! - Ink bounds, which may reach past the advance box
//! - Embedded bold font (DejaVu Sans Bold), no system font lookup
//!
//! # Example
//!
//! ```ignore
//! use inkstamp::watermark::text_renderer::layout_text;
//!
//! let layout = layout_text("© 2025", 48.0).unwrap();
//! println!("{} glyphs, {}px wide", layout.glyphs.len(), layout.metrics.width);
//! ```

use super::WatermarkError;
use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use vello_cpu::kurbo::Rect;
use vello_cpu::peniko::{Blob, FontData};

/// Embedded bold face. Watermark text is always drawn bold.
static DEFAULT_FONT: OnceLock<Option<FontRef<'static>>> = OnceLock::new();

/// Same face, in the form the rasterizer consumes.
static FONT_DATA: OnceLock<FontData> = OnceLock::new();

/// DejaVu Sans Bold (Bitstream Vera derived license, freely redistributable).
const EMBEDDED_FONT_DATA: &[u8] = include_bytes!("fonts/DejaVuSans-Bold.ttf");

/// Get the default font, initializing it lazily.
fn get_default_font() -> Result<&'static FontRef<'static>, WatermarkError> {
    DEFAULT_FONT
        .get_or_init(|| FontRef::try_from_slice(EMBEDDED_FONT_DATA).ok())
        .as_ref()
        .ok_or_else(|| WatermarkError::RenderError("Failed to load embedded font".to_string()))
}

/// Rasterizer handle for the embedded font.
pub(crate) fn font_data() -> &'static FontData {
    FONT_DATA.get_or_init(|| FontData::new(Blob::from(EMBEDDED_FONT_DATA.to_vec()), 0))
}

/// ab_glyph scales by line height; convert an em size to that scale.
fn px_scale(font: &FontRef<'_>, em_px: f32) -> PxScale {
    match font.units_per_em() {
        Some(units_per_em) if units_per_em > 0.0 => {
            PxScale::from(em_px * font.height_unscaled() / units_per_em)
        }
        _ => PxScale::from(em_px),
    }
}

/// RGBA color parsed from a hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Opaque color.
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self::with_alpha(r, g, b, 255)
    }

    pub fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// White color.
    pub fn white() -> Self {
        Self::new(255, 255, 255)
    }

    /// Black color.
    pub fn black() -> Self {
        Self::new(0, 0, 0)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02X}", self.a)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Color {
    type Error = WatermarkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_hex_color(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl std::str::FromStr for Color {
    type Err = WatermarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_color(s)
    }
}

fn hex_byte(digits: &str) -> Result<u8, WatermarkError> {
    u8::from_str_radix(digits, 16)
        .map_err(|_| WatermarkError::ConfigError(format!("Invalid hex digits '{}'", digits)))
}

/// Parse a hex color string into RGBA components.
///
/// Supports #RGB, #RRGGBB and #RRGGBBAA formats. Colors without an alpha
/// component are opaque.
///
/// # Examples
///
/// ```ignore
/// let white = parse_hex_color("#FFF").unwrap();
/// assert_eq!(white, Color::new(255, 255, 255));
///
/// let translucent_red = parse_hex_color("#FF000080").unwrap();
/// assert_eq!(translucent_red, Color::with_alpha(255, 0, 0, 128));
/// ```
pub fn parse_hex_color(hex: &str) -> Result<Color, WatermarkError> {
    let hex = hex
        .strip_prefix('#')
        .ok_or_else(|| WatermarkError::ConfigError("Color must start with '#'".to_string()))?;

    if !hex.is_ascii() {
        return Err(WatermarkError::ConfigError(
            "Color must contain only hex digits".to_string(),
        ));
    }

    match hex.len() {
        3 => {
            // #RGB format - each digit doubled: 0xF -> 0xFF, 0xA -> 0xAA
            let r = hex_byte(&hex[0..1])?;
            let g = hex_byte(&hex[1..2])?;
            let b = hex_byte(&hex[2..3])?;
            Ok(Color::new(r * 17, g * 17, b * 17))
        }
        6 => Ok(Color::new(
            hex_byte(&hex[0..2])?,
            hex_byte(&hex[2..4])?,
            hex_byte(&hex[4..6])?,
        )),
        8 => Ok(Color::with_alpha(
            hex_byte(&hex[0..2])?,
            hex_byte(&hex[2..4])?,
            hex_byte(&hex[4..6])?,
            hex_byte(&hex[6..8])?,
        )),
        _ => Err(WatermarkError::ConfigError(format!(
            "Color must be #RGB, #RRGGBB or #RRGGBBAA format, got {} characters",
            hex.len()
        ))),
    }
}

/// Measured extent of a line of text at a given pixel size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    /// Advance width including kerning
    pub width: f32,
    /// Distance from the top of the line box to the baseline
    pub ascent: f32,
    /// Distance from the baseline to the bottom of the line box (positive)
    pub descent: f32,
}

impl TextMetrics {
    /// Height of the line box.
    pub fn height(&self) -> f32 {
        self.ascent + self.descent
    }
}

/// Calculate the extent of rendered text at an em size of `font_size` px.
pub fn measure_text(text: &str, font_size: f32) -> Result<TextMetrics, WatermarkError> {
    layout_text(text, font_size).map(|layout| layout.metrics)
}

/// A glyph positioned relative to the top-left of the line box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedGlyph {
    pub id: u32,
    /// Pen position
    pub x: f32,
    /// Baseline
    pub y: f32,
}

/// A laid-out line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub font_size: f32,
    pub glyphs: Vec<PlacedGlyph>,
    pub metrics: TextMetrics,
    /// Pixel bounds of the glyph outlines, `None` when nothing has ink
    pub ink: Option<Rect>,
}

impl TextLayout {
    /// The line box, `[0, width] x [0, ascent + descent]`.
    pub fn line_box(&self) -> Rect {
        Rect::new(
            0.0,
            0.0,
            self.metrics.width as f64,
            self.metrics.height() as f64,
        )
    }

    /// Everything drawing this layout can touch: line box plus ink.
    pub fn bounds(&self) -> Rect {
        match self.ink {
            Some(ink) => self.line_box().union(ink),
            None => self.line_box(),
        }
    }
}

/// Lay out `text` on one line with the baseline at `ascent`.
///
/// Pen positions follow advance widths and kerning. Ink bounds come from
/// the glyph outlines, so a negative left bearing or a trailing overhang
/// shows up outside the line box instead of being lost.
pub fn layout_text(text: &str, font_size: f32) -> Result<TextLayout, WatermarkError> {
    let font = get_default_font()?;
    let scale = px_scale(font, font_size);
    let scaled_font = font.as_scaled(scale);
    let baseline = scaled_font.ascent();

    let mut glyphs = Vec::with_capacity(text.len());
    let mut ink: Option<Rect> = None;
    let mut cursor_x = 0.0f32;
    let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

    for c in text.chars() {
        let glyph_id = scaled_font.glyph_id(c);

        if let Some(prev) = prev_glyph {
            cursor_x += scaled_font.kern(prev, glyph_id);
        }

        let glyph = glyph_id.with_scale_and_position(scale, ab_glyph::point(cursor_x, baseline));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let b = outlined.px_bounds();
            let glyph_ink = Rect::new(
                b.min.x as f64,
                b.min.y as f64,
                b.max.x as f64,
                b.max.y as f64,
            );
            ink = Some(match ink {
                Some(acc) => acc.union(glyph_ink),
                None => glyph_ink,
            });
        }

        glyphs.push(PlacedGlyph {
            id: u32::from(glyph_id.0),
            x: cursor_x,
            y: baseline,
        });

        cursor_x += scaled_font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    Ok(TextLayout {
        font_size,
        glyphs,
        metrics: TextMetrics {
            width: cursor_x,
            ascent: baseline,
            descent: -scaled_font.descent(),
        },
        ink,
    })
}
