//! Render target: the base image plus a vector layer drawn on top of it.
//!
//! The compositor never touches pixels directly. It resets the target to
//! the base image, then for every watermark instance opens a [`DrawScope`],
//! applies translate/rotate, draws a paint and lets the scope drop, which
//! restores the previous transform. Transform state therefore cannot leak
//! from one tile into the next.
//!
//! Draws are recorded into a `vello_cpu` render context under the current
//! transform: images as an image-filled rectangle, text as glyph outlines.
//! [`RenderTarget::flush`] rasterizes the recorded layer and composites it
//! over the base.
//!
//! # Example
//!
//! ```ignore
//! let mut target = RenderTarget::new();
//! target.reset_to(&base);
//! {
//!     let mut scope = target.save();
//!     scope.translate(200.0, 100.0);
//!     scope.rotate_degrees(-30.0);
//!     scope.draw_image(&paint, -40.0, -10.0);
//! } // transform restored here
//! target.flush();
//! ```

use super::text_renderer::{font_data, Color, TextLayout};
use image::{Rgba, RgbaImage};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use vello_cpu::kurbo::{Affine, Rect};
use vello_cpu::peniko::color::PremulRgba8;
use vello_cpu::{Pixmap, RenderContext};

/// An image ready to be drawn, with its opacity already applied.
#[derive(Clone)]
pub struct ImagePaint {
    paint: vello_cpu::Image,
    width: f64,
    height: f64,
}

impl std::fmt::Debug for ImagePaint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePaint")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl ImagePaint {
    /// Premultiply `pixels` and scale them by `opacity`.
    ///
    /// Returns `None` for empty images and images wider or taller than the
    /// rasterizer supports (65535 px).
    pub fn new(pixels: &RgbaImage, opacity: f32) -> Option<Self> {
        let w: u16 = pixels.width().try_into().ok()?;
        let h: u16 = pixels.height().try_into().ok()?;
        if w == 0 || h == 0 {
            return None;
        }

        let op = opacity_u8(opacity);
        let mut may_have_opacities = op != 255;
        let mut premul = Vec::with_capacity(w as usize * h as usize);
        for p in pixels.pixels() {
            let a = mul_div255(p[3], op);
            may_have_opacities |= a != 255;
            premul.push(PremulRgba8 {
                r: mul_div255(p[0], a),
                g: mul_div255(p[1], a),
                b: mul_div255(p[2], a),
                a,
            });
        }

        let pixmap = Pixmap::from_parts_with_opacity(premul, w, h, may_have_opacities);
        Some(Self {
            paint: vello_cpu::Image {
                image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
                sampler: vello_cpu::peniko::ImageSampler::default(),
            },
            width: f64::from(w),
            height: f64::from(h),
        })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Local area covered when drawn at the origin.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// A text layout with its fill color, opacity already folded into alpha.
#[derive(Debug, Clone)]
pub struct TextPaint {
    layout: TextLayout,
    color: Color,
}

impl TextPaint {
    pub fn new(layout: TextLayout, color: Color, opacity: f32) -> Self {
        let color = Color::with_alpha(
            color.r,
            color.g,
            color.b,
            mul_div255(color.a, opacity_u8(opacity)),
        );
        Self { layout, color }
    }

    pub fn layout(&self) -> &TextLayout {
        &self.layout
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Local area covered when drawn at the origin, ink included.
    pub fn bounds(&self) -> Rect {
        self.layout.bounds()
    }
}

/// Mutable drawing surface the compositor paints into.
pub struct RenderTarget {
    pixels: RgbaImage,
    /// Recorded vector layer, created on the first draw after a reset
    layer: Option<RenderContext>,
    transform: Affine,
    saved: Vec<Affine>,
}

impl std::fmt::Debug for RenderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTarget")
            .field("width", &self.pixels.width())
            .field("height", &self.pixels.height())
            .field("pending_layer", &self.layer.is_some())
            .field("transform", &self.transform)
            .field("save_depth", &self.saved.len())
            .finish()
    }
}

impl Default for RenderTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderTarget {
    /// Create an empty (0x0) target.
    pub fn new() -> Self {
        Self {
            pixels: RgbaImage::new(0, 0),
            layer: None,
            transform: Affine::IDENTITY,
            saved: Vec::new(),
        }
    }

    /// Resize to the base image, clear, and draw the base at the origin.
    ///
    /// The new buffer is fully built before it replaces the old one, and
    /// pending draws and the transform stack are dropped, so nothing from a
    /// previous render survives.
    pub fn reset_to(&mut self, base: &RgbaImage) {
        let mut fresh = RgbaImage::new(base.width(), base.height());
        image::imageops::replace(&mut fresh, base, 0, 0);

        self.pixels = fresh;
        self.layer = None;
        self.transform = Affine::IDENTITY;
        self.saved.clear();
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Whether the canvas fits the rasterizer (both sides 1..=65535 px).
    pub fn can_draw(&self) -> bool {
        canvas_size(&self.pixels).is_some()
    }

    /// Whether draws are recorded but not yet flushed.
    pub fn has_pending(&self) -> bool {
        self.layer.is_some()
    }

    /// Current pixels. Draws show up here after [`flush`](Self::flush).
    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Flush and take the pixels out of the target.
    pub fn into_image(mut self) -> RgbaImage {
        self.flush();
        self.pixels
    }

    /// Current local-to-device transform.
    pub fn transform(&self) -> Affine {
        self.transform
    }

    /// Depth of the saved-state stack.
    pub fn save_depth(&self) -> usize {
        self.saved.len()
    }

    /// Push the current transform; it is restored when the scope drops.
    pub fn save(&mut self) -> DrawScope<'_> {
        let depth = self.saved.len();
        self.saved.push(self.transform);
        DrawScope {
            target: self,
            depth,
        }
    }

    fn restore_to(&mut self, depth: usize) {
        if let Some(transform) = self.saved.get(depth).copied() {
            self.transform = transform;
            self.saved.truncate(depth);
        }
    }

    /// Move the local origin by `(dx, dy)` in local coordinates.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.transform = self.transform * Affine::translate((dx, dy));
    }

    /// Rotate local axes clockwise (y points down) by `radians`.
    pub fn rotate(&mut self, radians: f64) {
        self.transform = self.transform * Affine::rotate(radians);
    }

    /// Rotate clockwise by `degrees`. Quarter turns are exact.
    pub fn rotate_degrees(&mut self, degrees: f64) {
        self.transform = self.transform * rotation(degrees);
    }

    /// Device-space bounding box of local `bounds` drawn at local `(x, y)`.
    pub fn device_bounds(&self, bounds: Rect, x: f64, y: f64) -> Rect {
        (self.transform * Affine::translate((x, y))).transform_rect_bbox(bounds)
    }

    /// Whether local `bounds` drawn at `(x, y)` overlap the canvas.
    pub fn touches_canvas(&self, bounds: Rect, x: f64, y: f64) -> bool {
        let device = self.device_bounds(bounds, x, y);
        device.x1 > 0.0
            && device.y1 > 0.0
            && device.x0 < self.pixels.width() as f64
            && device.y0 < self.pixels.height() as f64
    }

    /// Draw `paint` with its top-left corner at local `(x, y)`.
    ///
    /// Returns `false` when the image misses the canvas entirely.
    pub fn draw_image(&mut self, paint: &ImagePaint, x: f64, y: f64) -> bool {
        if !self.touches_canvas(paint.bounds(), x, y) {
            return false;
        }
        let transform = self.transform * Affine::translate((x, y));
        let Some(ctx) = self.layer() else {
            return false;
        };

        ctx.set_paint_transform(Affine::IDENTITY);
        ctx.set_transform(transform);
        ctx.set_paint(paint.paint.clone());
        ctx.fill_rect(&paint.bounds());
        true
    }

    /// Draw `paint` with the top-left of its line box at local `(x, y)`.
    ///
    /// Returns `false` when no glyph can reach the canvas.
    pub fn draw_text(&mut self, paint: &TextPaint, x: f64, y: f64) -> bool {
        if paint.layout.glyphs.is_empty() || !self.touches_canvas(paint.bounds(), x, y) {
            return false;
        }
        let transform = self.transform * Affine::translate((x, y));
        let Some(ctx) = self.layer() else {
            return false;
        };

        let Color { r, g, b, a } = paint.color;
        ctx.set_paint_transform(Affine::IDENTITY);
        ctx.set_transform(transform);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));

        let glyphs = paint.layout.glyphs.iter().map(|g| vello_cpu::Glyph {
            id: g.id,
            x: g.x,
            y: g.y,
        });
        ctx.glyph_run(font_data())
            .font_size(paint.layout.font_size)
            .fill_glyphs(glyphs);
        true
    }

    /// Rasterize pending draws and composite them over the pixels.
    pub fn flush(&mut self) {
        let Some(mut ctx) = self.layer.take() else {
            return;
        };
        let Some((w, h)) = canvas_size(&self.pixels) else {
            return;
        };

        let mut layer = Pixmap::new(w, h);
        ctx.flush();
        ctx.render_to_pixmap(&mut layer);

        for (dst, src) in self
            .pixels
            .pixels_mut()
            .zip(layer.data_as_u8_slice().chunks_exact(4))
        {
            *dst = over_straight(*dst, [src[0], src[1], src[2], src[3]]);
        }
    }

    fn layer(&mut self) -> Option<&mut RenderContext> {
        if self.layer.is_none() {
            let (w, h) = canvas_size(&self.pixels)?;
            self.layer = Some(RenderContext::new(w, h));
        }
        self.layer.as_mut()
    }
}

/// Guard returned by [`RenderTarget::save`].
///
/// Derefs to the target; dropping it restores the transform that was
/// current when it was created.
pub struct DrawScope<'a> {
    target: &'a mut RenderTarget,
    depth: usize,
}

impl Deref for DrawScope<'_> {
    type Target = RenderTarget;

    fn deref(&self) -> &Self::Target {
        self.target
    }
}

impl DerefMut for DrawScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.target
    }
}

impl Drop for DrawScope<'_> {
    fn drop(&mut self) {
        self.target.restore_to(self.depth);
    }
}

fn canvas_size(pixels: &RgbaImage) -> Option<(u16, u16)> {
    let w: u16 = pixels.width().try_into().ok()?;
    let h: u16 = pixels.height().try_into().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}

/// Clockwise rotation with exact coefficients for multiples of 90 degrees.
fn rotation(degrees: f64) -> Affine {
    let quarter_turns = degrees / 90.0;
    if quarter_turns.fract() != 0.0 || !quarter_turns.is_finite() {
        return Affine::rotate(degrees.to_radians());
    }
    match (quarter_turns as i64).rem_euclid(4) {
        0 => Affine::IDENTITY,
        1 => Affine::new([0.0, 1.0, -1.0, 0.0, 0.0, 0.0]),
        2 => Affine::new([-1.0, 0.0, 0.0, -1.0, 0.0, 0.0]),
        _ => Affine::new([0.0, -1.0, 1.0, 0.0, 0.0, 0.0]),
    }
}

fn opacity_u8(opacity: f32) -> u8 {
    (opacity.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn mul_div255(x: u8, y: u8) -> u8 {
    ((u32::from(x) * u32::from(y) + 127) / 255) as u8
}

/// Composite a premultiplied source over a straight-alpha pixel.
fn over_straight(dst: Rgba<u8>, src: [u8; 4]) -> Rgba<u8> {
    let sa = src[3];
    if sa == 0 {
        return dst;
    }

    // Destination alpha left visible through the source
    let da = mul_div255(dst[3], 255 - sa);
    let out_a = u32::from(sa) + u32::from(da);

    let channel = |s: u8, d: u8| -> u8 {
        let premul = u32::from(s) + u32::from(mul_div255(d, da));
        ((premul * 255 + out_a / 2) / out_a).min(255) as u8
    };

    Rgba([
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        out_a.min(255) as u8,
    ])
}
