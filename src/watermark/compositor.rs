//! Watermark compositor: draws one watermark layer over a base image.
//!
//! The compositor prepares a paint for the active layer (laid-out text or
//! the resized watermark image) and then draws it either once at an anchor
//! or repeatedly across a brick-laid grid that overscans the canvas so the
//! pattern still covers every corner after rotation.
//!
//! # Features
//!
//! - Nine-anchor single placement with a proportional inset
//! - Tiled placement with half-tile offset on odd rows
//! - Clockwise rotation around each instance's own origin
//! - Layer opacity folded into the paint, on top of the content's own alpha
//! - Hard cap on drawn tiles, spent only on cells that can reach the canvas
//!
//! # Example
//!
//! ```ignore
//! use inkstamp::watermark::{Compositor, RenderTarget, WatermarkSettings};
//!
//! let compositor = Compositor::new();
//! let mut target = RenderTarget::new();
//! let settings = WatermarkSettings::default().with_tiled(true).with_rotation(-30);
//! let report = compositor.render(&base, &mut target, &settings);
//! let output = target.image();
//! ```

use super::position::{
    alignment_offset, anchor_point, centered_offset, ImageDimensions, TileGrid, TilePolicy,
    WatermarkDimensions,
};
use super::surface::{ImagePaint, RenderTarget, TextPaint};
use super::text_renderer::layout_text;
use super::{WatermarkKind, WatermarkSettings};
use image::imageops::FilterType;
use image::RgbaImage;
use vello_cpu::kurbo::{Rect, Vec2};

/// Which placement strategy a render used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Single,
    Tiled,
}

/// Summary of one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderReport {
    pub mode: RenderMode,
    /// Whether a watermark layer was prepared at all
    pub layer_drawn: bool,
    /// Instances that touched the canvas
    pub tiles_drawn: usize,
    /// Grid cells near the canvas whose instance still missed it
    pub tiles_skipped: usize,
    /// Tile generation stopped at the configured cap
    pub capped: bool,
}

impl RenderReport {
    fn empty(mode: RenderMode) -> Self {
        Self {
            mode,
            layer_drawn: false,
            tiles_drawn: 0,
            tiles_skipped: 0,
            capped: false,
        }
    }
}

/// Content of a prepared layer.
#[derive(Debug)]
enum LayerPaint {
    Text(TextPaint),
    Image(ImagePaint),
}

/// Watermark ready to draw.
#[derive(Debug)]
struct PreparedLayer {
    paint: LayerPaint,
    /// Box that anchors and centering align
    content: WatermarkDimensions,
    /// Footprint used for tile spacing
    footprint: WatermarkDimensions,
}

impl PreparedLayer {
    /// Local area the paint can touch when drawn at the origin.
    fn bounds(&self) -> Rect {
        match &self.paint {
            LayerPaint::Text(text) => text.bounds(),
            LayerPaint::Image(image) => image.bounds(),
        }
    }

    fn draw(&self, target: &mut RenderTarget, x: f64, y: f64) -> bool {
        match &self.paint {
            LayerPaint::Text(text) => target.draw_text(text, x, y),
            LayerPaint::Image(image) => target.draw_image(image, x, y),
        }
    }
}

/// Stateless watermark renderer.
#[derive(Debug, Clone, Default)]
pub struct Compositor {
    policy: TilePolicy,
}

impl Compositor {
    /// Create a compositor with the default tiling policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compositor with a custom tiling policy.
    pub fn with_policy(policy: TilePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &TilePolicy {
        &self.policy
    }

    /// Render `settings` over `base` into `target`.
    ///
    /// The target is always reset to a copy of `base` first, so rendering
    /// is idempotent. Missing or empty content leaves the base untouched.
    /// The target is flushed before returning.
    pub fn render(
        &self,
        base: &RgbaImage,
        target: &mut RenderTarget,
        settings: &WatermarkSettings,
    ) -> RenderReport {
        let mode = if settings.tiled {
            RenderMode::Tiled
        } else {
            RenderMode::Single
        };

        target.reset_to(base);

        if base.width() == 0 || base.height() == 0 {
            return RenderReport::empty(mode);
        }

        let Some(layer) = prepare_layer(base.width(), settings) else {
            tracing::debug!(kind = ?settings.kind, "No watermark content, base image only");
            return RenderReport::empty(mode);
        };

        if !target.can_draw() {
            tracing::warn!(
                width = base.width(),
                height = base.height(),
                "Image too large for the watermark layer, base image only"
            );
            return RenderReport::empty(mode);
        }

        let image = ImageDimensions::new(base.width(), base.height());
        let report = match mode {
            RenderMode::Single => self.draw_single(target, &layer, &image, settings),
            RenderMode::Tiled => self.draw_tiled(target, &layer, &image, settings),
        };
        target.flush();

        tracing::debug!(
            mode = ?report.mode,
            tiles_drawn = report.tiles_drawn,
            tiles_skipped = report.tiles_skipped,
            capped = report.capped,
            "Watermark rendered"
        );

        report
    }

    /// Render into a fresh buffer and return it with the report.
    pub fn render_image(
        &self,
        base: &RgbaImage,
        settings: &WatermarkSettings,
    ) -> (RgbaImage, RenderReport) {
        let mut target = RenderTarget::new();
        let report = self.render(base, &mut target, settings);
        (target.into_image(), report)
    }

    fn draw_single(
        &self,
        target: &mut RenderTarget,
        layer: &PreparedLayer,
        image: &ImageDimensions,
        settings: &WatermarkSettings,
    ) -> RenderReport {
        let point = anchor_point(settings.anchor, image);
        let offset = alignment_offset(settings.anchor, &layer.content);

        let mut scope = target.save();
        scope.translate(point.x, point.y);
        scope.rotate_degrees(settings.rotation as f64);
        let drawn = layer.draw(&mut scope, offset.x, offset.y);

        RenderReport {
            mode: RenderMode::Single,
            layer_drawn: true,
            tiles_drawn: usize::from(drawn),
            tiles_skipped: usize::from(!drawn),
            capped: false,
        }
    }

    fn draw_tiled(
        &self,
        target: &mut RenderTarget,
        layer: &PreparedLayer,
        image: &ImageDimensions,
        settings: &WatermarkSettings,
    ) -> RenderReport {
        let grid = TileGrid::new(image, &layer.footprint, settings.gap as f64, &self.policy);
        let offset = centered_offset(&layer.content);
        let margin = reach(layer.bounds() + Vec2::new(offset.x, offset.y));

        let capped = grid.is_capped(margin);
        if capped {
            tracing::warn!(
                cells = grid.visible_cell_count(margin),
                max_tiles = grid.max_tiles,
                spacing_x = grid.spacing_x,
                spacing_y = grid.spacing_y,
                "Tile grid exceeds cap, truncating"
            );
        }

        let rotation = settings.rotation as f64;
        let mut drawn = 0usize;
        let mut skipped = 0usize;

        for cell in grid.placements(margin) {
            let mut scope = target.save();
            scope.translate(cell.x, cell.y);
            scope.rotate_degrees(rotation);
            if layer.draw(&mut scope, offset.x, offset.y) {
                drawn += 1;
            } else {
                skipped += 1;
            }
        }

        RenderReport {
            mode: RenderMode::Tiled,
            layer_drawn: true,
            tiles_drawn: drawn,
            tiles_skipped: skipped,
            capped,
        }
    }
}

/// Farthest any point of `bounds` gets from the instance origin under any
/// rotation.
fn reach(bounds: Rect) -> f64 {
    [
        (bounds.x0, bounds.y0),
        (bounds.x1, bounds.y0),
        (bounds.x0, bounds.y1),
        (bounds.x1, bounds.y1),
    ]
    .into_iter()
    .map(|(x, y)| x.hypot(y))
    .fold(0.0, f64::max)
}

/// Build the paint for the active layer, or `None` when there is nothing
/// to draw.
fn prepare_layer(base_width: u32, settings: &WatermarkSettings) -> Option<PreparedLayer> {
    match settings.kind {
        WatermarkKind::Text => prepare_text_layer(base_width, settings),
        WatermarkKind::Image => prepare_image_layer(base_width, settings),
    }
}

fn prepare_text_layer(base_width: u32, settings: &WatermarkSettings) -> Option<PreparedLayer> {
    if settings.text.is_empty() {
        return None;
    }

    let font_px = settings.font_size / 100.0 * base_width as f32;
    if !font_px.is_finite() || font_px <= 0.0 {
        return None;
    }

    match layout_text(&settings.text, font_px) {
        Ok(layout) => {
            let metrics = layout.metrics;
            Some(PreparedLayer {
                content: WatermarkDimensions::new(metrics.width as f64, metrics.height() as f64),
                footprint: WatermarkDimensions::new(metrics.width as f64, font_px as f64),
                paint: LayerPaint::Text(TextPaint::new(layout, settings.color, settings.opacity)),
            })
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to prepare text watermark, layer omitted");
            None
        }
    }
}

fn prepare_image_layer(base_width: u32, settings: &WatermarkSettings) -> Option<PreparedLayer> {
    let source = settings.watermark_image.as_ref()?;
    if source.width() == 0 || source.height() == 0 {
        return None;
    }

    let drawn_width = settings.image_scale as f64 / 100.0 * base_width as f64;
    let drawn_height = drawn_width * source.height() as f64 / source.width() as f64;
    if !drawn_width.is_finite() || drawn_width <= 0.0 {
        return None;
    }

    let target_w = (drawn_width.round() as u32).max(1);
    let target_h = (drawn_height.round() as u32).max(1);

    let resized;
    let pixels: &RgbaImage = if source.width() == target_w && source.height() == target_h {
        source
    } else {
        resized = image::imageops::resize(&**source, target_w, target_h, FilterType::Lanczos3);
        &resized
    };

    let Some(paint) = ImagePaint::new(pixels, settings.opacity) else {
        tracing::warn!(
            width = target_w,
            height = target_h,
            "Watermark image too large to draw, layer omitted"
        );
        return None;
    };

    Some(PreparedLayer {
        content: WatermarkDimensions::new(paint.width(), paint.height()),
        footprint: WatermarkDimensions::new(drawn_width, drawn_height),
        paint: LayerPaint::Image(paint),
    })
}
