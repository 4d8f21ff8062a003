//! Position calculation for watermark placement.
//!
//! This module computes where watermark instances go, independent of any
//! pixels: the anchor point and content alignment for single-position mode,
//! and the brick-laid tile grid for tiled mode.
//!
//! # Position Modes
//!
//! - **Single position**: one of 9 anchors, inset from the canvas edges
//! - **Tiled**: staggered rows covering an overscan region three canvas
//!   diagonals wide, so rotated instances never leave gaps at the corners
//!
//! # Example
//!
//! ```ignore
//! use inkstamp::watermark::position::{anchor_point, ImageDimensions};
//! use inkstamp::watermark::Anchor;
//!
//! let image = ImageDimensions { width: 1000, height: 800 };
//! let point = anchor_point(Anchor::BottomRight, &image);
//! assert_eq!(point, PlacementPoint::new(950.0, 750.0)); // inset = 5% of 1000
//! ```

use super::{Anchor, HorizontalAlign, VerticalAlign};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Minimum inset in pixels between a single-position watermark and the edge.
pub const MIN_INSET: f64 = 20.0;

/// Inset as a fraction of the base image width.
pub const INSET_RATIO: f64 = 0.05;

/// Dimensions of the target image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Length of the canvas diagonal.
    pub fn diagonal(&self) -> f64 {
        (self.width as f64).hypot(self.height as f64)
    }
}

/// Rendered footprint of one watermark instance, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatermarkDimensions {
    pub width: f64,
    pub height: f64,
}

impl WatermarkDimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A point in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementPoint {
    pub x: f64,
    pub y: f64,
}

impl PlacementPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Edge margin for single-position mode: `max(20px, 5% of base width)`.
pub fn inset(image: &ImageDimensions) -> f64 {
    MIN_INSET.max(image.width as f64 * INSET_RATIO)
}

/// Calculate the anchor point for single-position mode.
///
/// Left/top anchors sit `inset` from the near edge, right/bottom anchors
/// `inset` from the far edge, center/middle anchors on the midline.
pub fn anchor_point(anchor: Anchor, image: &ImageDimensions) -> PlacementPoint {
    let pad = inset(image);
    let w = image.width as f64;
    let h = image.height as f64;

    let x = match anchor.horizontal() {
        HorizontalAlign::Left => pad,
        HorizontalAlign::Center => w / 2.0,
        HorizontalAlign::Right => w - pad,
    };
    let y = match anchor.vertical() {
        VerticalAlign::Top => pad,
        VerticalAlign::Middle => h / 2.0,
        VerticalAlign::Bottom => h - pad,
    };

    PlacementPoint::new(x, y)
}

/// Offset of the content box's top-left corner relative to the anchor.
///
/// The anchored side of the content touches the anchor: a left anchor puts
/// the left edge on it, center centers on it, right puts the right edge on
/// it. Vertical works the same with top/middle/bottom.
pub fn alignment_offset(anchor: Anchor, content: &WatermarkDimensions) -> PlacementPoint {
    let x = match anchor.horizontal() {
        HorizontalAlign::Left => 0.0,
        HorizontalAlign::Center => -content.width / 2.0,
        HorizontalAlign::Right => -content.width,
    };
    let y = match anchor.vertical() {
        VerticalAlign::Top => 0.0,
        VerticalAlign::Middle => -content.height / 2.0,
        VerticalAlign::Bottom => -content.height,
    };
    PlacementPoint::new(x, y)
}

/// Offset that centers content on the local origin (tiled instances).
pub fn centered_offset(content: &WatermarkDimensions) -> PlacementPoint {
    PlacementPoint::new(-content.width / 2.0, -content.height / 2.0)
}

fn default_vertical_factor() -> f64 {
    3.0
}

fn default_horizontal_padding_factor() -> f64 {
    1.0
}

fn default_gap_divisor() -> f64 {
    200.0
}

fn default_min_spacing() -> f64 {
    4.0
}

fn default_max_tiles() -> usize {
    20_000
}

/// Tuning constants for tiled layout.
///
/// `spacing_x = content_w + base_w * gap / gap_divisor + content_h * horizontal_padding_factor`
/// `spacing_y = content_h * vertical_factor + base_w * gap / gap_divisor`
///
/// Both spacings are floored at `min_spacing`, and at most `max_tiles` grid
/// cells near the canvas are visited per render.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TilePolicy {
    #[serde(default = "default_vertical_factor")]
    pub vertical_factor: f64,

    #[serde(default = "default_horizontal_padding_factor")]
    pub horizontal_padding_factor: f64,

    #[serde(default = "default_gap_divisor")]
    pub gap_divisor: f64,

    #[serde(default = "default_min_spacing")]
    pub min_spacing: f64,

    #[serde(default = "default_max_tiles")]
    pub max_tiles: usize,
}

impl Default for TilePolicy {
    fn default() -> Self {
        Self {
            vertical_factor: default_vertical_factor(),
            horizontal_padding_factor: default_horizontal_padding_factor(),
            gap_divisor: default_gap_divisor(),
            min_spacing: default_min_spacing(),
            max_tiles: default_max_tiles(),
        }
    }
}

impl TilePolicy {
    pub fn validate(&self) -> Result<(), String> {
        let positive = [
            ("vertical_factor", self.vertical_factor),
            ("gap_divisor", self.gap_divisor),
            ("min_spacing", self.min_spacing),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!(
                    "tiling {} must be a positive finite value, got {}",
                    name, value
                ));
            }
        }

        if !self.horizontal_padding_factor.is_finite() || self.horizontal_padding_factor < 0.0 {
            return Err(format!(
                "tiling horizontal_padding_factor must be a non-negative finite value, got {}",
                self.horizontal_padding_factor
            ));
        }

        if self.max_tiles == 0 {
            return Err("tiling max_tiles must be at least 1".to_string());
        }

        Ok(())
    }

    /// Distance between neighbouring tiles, before the minimum floor.
    pub fn raw_spacing(
        &self,
        image: &ImageDimensions,
        content: &WatermarkDimensions,
        gap: f64,
    ) -> (f64, f64) {
        let gap_px = image.width as f64 * gap / self.gap_divisor;
        let spacing_x = content.width + gap_px + content.height * self.horizontal_padding_factor;
        let spacing_y = content.height * self.vertical_factor + gap_px;
        (spacing_x, spacing_y)
    }

    /// Distance between neighbouring tiles with the minimum floor applied.
    ///
    /// Non-finite spacing (NaN from degenerate inputs) also falls back to
    /// the floor so the grid loop always advances.
    pub fn spacing(
        &self,
        image: &ImageDimensions,
        content: &WatermarkDimensions,
        gap: f64,
    ) -> (f64, f64) {
        let (x, y) = self.raw_spacing(image, content, gap);
        (self.floor(x), self.floor(y))
    }

    fn floor(&self, spacing: f64) -> f64 {
        if spacing.is_finite() {
            spacing.max(self.min_spacing)
        } else {
            self.min_spacing
        }
    }
}

/// One cell of the tile grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePlacement {
    /// Row index, `floor(y / spacing_y)`
    pub row: i64,
    /// Grid x before the brick offset
    pub grid_x: f64,
    /// Translation of the instance origin (brick offset applied)
    pub x: f64,
    pub y: f64,
}

/// Brick-laid tile grid covering `[-diag, 2 * diag)` on both axes.
///
/// Cell positions are always indexed from `start`, so row parity and
/// coordinates do not depend on which cells are visited. Iteration only
/// visits cells whose instance can reach the canvas, and the tile cap is
/// spent on those.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGrid {
    pub spacing_x: f64,
    pub spacing_y: f64,
    /// Inclusive start of the overscan region (`-diag`)
    pub start: f64,
    /// Exclusive end of the overscan region (`2 * diag`)
    pub end: f64,
    pub max_tiles: usize,
    pub canvas_width: f64,
    pub canvas_height: f64,
}

impl TileGrid {
    pub fn new(
        image: &ImageDimensions,
        content: &WatermarkDimensions,
        gap: f64,
        policy: &TilePolicy,
    ) -> Self {
        let (spacing_x, spacing_y) = policy.spacing(image, content, gap);
        let diag = image.diagonal();
        Self {
            spacing_x,
            spacing_y,
            start: -diag,
            end: diag * 2.0,
            max_tiles: policy.max_tiles,
            canvas_width: image.width as f64,
            canvas_height: image.height as f64,
        }
    }

    /// Horizontal shift applied to a row: half a tile on odd rows.
    pub fn row_offset(&self, row: i64) -> f64 {
        if row.rem_euclid(2) == 1 {
            self.spacing_x / 2.0
        } else {
            0.0
        }
    }

    /// Rows in the full overscan grid.
    pub fn row_count(&self) -> u64 {
        self.steps(self.spacing_y)
    }

    /// Columns in the full overscan grid.
    pub fn column_count(&self) -> u64 {
        self.steps(self.spacing_x)
    }

    fn steps(&self, spacing: f64) -> u64 {
        ((self.end - self.start) / spacing).ceil().max(0.0) as u64
    }

    /// Indices `i` whose coordinate `start + shift + i * spacing` lies in
    /// `[low, high]`, clamped to `0..count`.
    fn index_range(&self, spacing: f64, shift: f64, low: f64, high: f64, count: u64) -> Range<u64> {
        let clamp = |v: f64| {
            if v.is_nan() {
                0
            } else {
                v.clamp(0.0, count as f64) as u64
            }
        };
        let first = clamp(((low - shift - self.start) / spacing).ceil());
        let last = clamp(((high - shift - self.start) / spacing).floor() + 1.0);
        first..last.max(first)
    }

    /// Row indices whose instances can come within `margin` of the canvas.
    fn visible_rows(&self, margin: f64) -> Range<u64> {
        self.index_range(
            self.spacing_y,
            0.0,
            -margin,
            self.canvas_height + margin,
            self.row_count(),
        )
    }

    /// Row index, y and brick shift of grid row `i`.
    fn row(&self, i: u64) -> (i64, f64, f64) {
        let y = self.start + i as f64 * self.spacing_y;
        let row = (y / self.spacing_y).floor() as i64;
        (row, y, self.row_offset(row))
    }

    fn visible_columns(&self, offset: f64, margin: f64) -> Range<u64> {
        self.index_range(
            self.spacing_x,
            offset,
            -margin,
            self.canvas_width + margin,
            self.column_count(),
        )
    }

    /// Cells whose center lies within `margin` of the canvas, uncapped.
    ///
    /// `margin` is how far an instance reaches from its center; pass
    /// `f64::INFINITY` to count the whole overscan grid.
    pub fn visible_cell_count(&self, margin: f64) -> u64 {
        let margin = sanitize_margin(margin);
        self.visible_rows(margin)
            .map(|i| {
                let (_, _, offset) = self.row(i);
                let columns = self.visible_columns(offset, margin);
                columns.end - columns.start
            })
            .sum()
    }

    /// Whether iteration with this `margin` will stop at `max_tiles`.
    pub fn is_capped(&self, margin: f64) -> bool {
        self.visible_cell_count(margin) > self.max_tiles as u64
    }

    /// Iterate row by row over cells within `margin` of the canvas, at most
    /// `max_tiles` of them.
    ///
    /// Coordinates are computed as `start + index * spacing` rather than by
    /// accumulation, so every render sees bit-identical positions.
    pub fn placements(&self, margin: f64) -> impl Iterator<Item = TilePlacement> + '_ {
        let margin = sanitize_margin(margin);
        self.visible_rows(margin)
            .flat_map(move |i| {
                let (row, y, offset) = self.row(i);
                self.visible_columns(offset, margin).map(move |j| {
                    let grid_x = self.start + j as f64 * self.spacing_x;
                    TilePlacement {
                        row,
                        grid_x,
                        x: grid_x + offset,
                        y,
                    }
                })
            })
            .take(self.max_tiles)
    }
}

/// NaN margins visit everything; negative ones count as zero.
fn sanitize_margin(margin: f64) -> f64 {
    if margin.is_nan() {
        f64::INFINITY
    } else {
        margin.max(0.0)
    }
}
