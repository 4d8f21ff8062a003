// Compositor property tests
//
// These tests pin down the observable behavior of a render: where pixels
// change, how much they change, and that nothing else does.

use image::{Rgba, RgbaImage};
use rstest::rstest;
use std::sync::Arc;

use inkstamp::watermark::*;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

fn white_base(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, WHITE)
}

fn solid_mark(width: u32, height: u32) -> Arc<RgbaImage> {
    Arc::new(RgbaImage::from_pixel(width, height, BLACK))
}

/// Gradient mark so mirrored renders are distinguishable.
fn gradient_mark(width: u32, height: u32) -> Arc<RgbaImage> {
    Arc::new(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 6) as u8, (y * 12) as u8, 40, 255])
    }))
}

fn image_settings(mark: Arc<RgbaImage>, scale: f32) -> WatermarkSettings {
    WatermarkSettings::default()
        .with_kind(WatermarkKind::Image)
        .with_watermark_image(mark)
        .with_image_scale(scale)
        .with_opacity(1.0)
}

fn changed_pixels<'a>(
    base: &'a RgbaImage,
    output: &'a RgbaImage,
) -> impl Iterator<Item = (u32, u32)> + 'a {
    base.enumerate_pixels()
        .filter(move |(x, y, p)| output.get_pixel(*x, *y) != *p)
        .map(|(x, y, _)| (x, y))
}

// Test: Same inputs give bit-identical output across targets
#[test]
fn test_render_is_deterministic() {
    let base = RgbaImage::from_fn(320, 240, |x, y| Rgba([x as u8, y as u8, 90, 255]));
    let settings = WatermarkSettings::default()
        .with_text("Determinism")
        .with_tiled(true)
        .with_rotation(-37)
        .with_opacity(0.6);
    let compositor = Compositor::new();

    let (first, first_report) = compositor.render_image(&base, &settings);
    let (second, second_report) = compositor.render_image(&base, &settings);

    assert_eq!(first, second);
    assert_eq!(first_report, second_report);
}

// Test: Bottom-right text never crosses the inset lines
#[test]
fn test_bottom_right_text_respects_inset() {
    let base = white_base(1000, 800);
    let settings = WatermarkSettings::default()
        .with_text("Corner")
        .with_color(Color::black())
        .with_opacity(1.0)
        .with_anchor(Anchor::BottomRight);

    let (output, report) = Compositor::new().render_image(&base, &settings);
    assert!(report.layer_drawn);

    let changed: Vec<(u32, u32)> = changed_pixels(&base, &output).collect();
    assert!(!changed.is_empty());

    // inset = max(20, 0.05 * 1000) = 50
    let max_x = changed.iter().map(|(x, _)| *x).max().unwrap();
    let max_y = changed.iter().map(|(_, y)| *y).max().unwrap();
    assert!(max_x < 950, "text crosses right inset at x={}", max_x);
    assert!(max_y < 750, "text crosses bottom inset at y={}", max_y);

    // Something is drawn close to the anchor
    assert!(max_x > 900);
    assert!(max_y > 700);
}

// Test: Rotating 180 degrees around a centered anchor mirrors the render
#[test]
fn test_rotation_180_is_point_mirror() {
    let base = white_base(400, 300);
    let settings = image_settings(gradient_mark(40, 20), 10.0).with_anchor(Anchor::Center);
    let compositor = Compositor::new();

    let (upright, _) = compositor.render_image(&base, &settings);
    let (flipped, _) = compositor.render_image(&base, &settings.with_rotation(180));

    assert_ne!(upright, base);
    // Anti-aliased coverage may round differently on mirrored edges
    for (x, y, pixel) in flipped.enumerate_pixels() {
        let mirrored = upright.get_pixel(399 - x, 299 - y);
        for channel in 0..4 {
            assert!(
                (pixel[channel] as i16 - mirrored[channel] as i16).abs() <= 1,
                "mismatch at ({}, {}): {:?} vs {:?}",
                x,
                y,
                pixel,
                mirrored
            );
        }
    }
}

// Test: Tile spacing follows the documented formula for the default text
#[test]
fn test_tile_spacing_regression() {
    // font 5% of 1000 = 50px, gap 20 -> 1000 * 20 / 200 = 100px
    let metrics = measure_text("© Watermark", 50.0).unwrap();
    let grid = TileGrid::new(
        &ImageDimensions::new(1000, 1000),
        &WatermarkDimensions::new(metrics.width as f64, 50.0),
        20.0,
        &TilePolicy::default(),
    );

    assert_eq!(grid.spacing_x, metrics.width as f64 + 100.0 + 50.0);
    assert_eq!(grid.spacing_y, 250.0);
    let diag = 2_000_000f64.sqrt();
    assert!((grid.start + diag).abs() < 1e-9);
    assert!((grid.end - 2.0 * diag).abs() < 1e-9);
}

// Test: Odd rows are shifted by exactly half the horizontal spacing
#[test]
fn test_brick_offset() {
    let grid = TileGrid::new(
        &ImageDimensions::new(600, 400),
        &WatermarkDimensions::new(120.0, 30.0),
        20.0,
        &TilePolicy::default(),
    );

    let mut saw_odd = false;
    let mut saw_even = false;
    for cell in grid.placements(f64::INFINITY) {
        if cell.row.rem_euclid(2) == 1 {
            saw_odd = true;
            assert_eq!(cell.x, cell.grid_x + grid.spacing_x / 2.0);
        } else {
            saw_even = true;
            assert_eq!(cell.x, cell.grid_x);
        }
    }
    assert!(saw_odd && saw_even);
}

// Test: Tiled output reaches every quadrant at common rotations
#[rstest]
#[case(0)]
#[case(45)]
#[case(90)]
#[case(180)]
#[case(-30)]
fn test_tiled_coverage(#[case] rotation: i32) {
    let base = white_base(600, 400);
    let settings = image_settings(solid_mark(60, 60), 10.0)
        .with_tiled(true)
        .with_rotation(rotation);

    let (output, report) = Compositor::new().render_image(&base, &settings);
    assert!(report.tiles_drawn >= 4, "only {} tiles drawn", report.tiles_drawn);
    assert!(!report.capped);

    let mut quadrants = [false; 4];
    for (x, y) in changed_pixels(&base, &output) {
        let index = usize::from(x >= 300) + 2 * usize::from(y >= 200);
        quadrants[index] = true;
    }
    assert_eq!(quadrants, [true; 4], "rotation {} leaves a gap", rotation);
}

// Test: Opacity scales the change linearly and leaves other pixels alone
#[rstest]
#[case(0.25)]
#[case(0.5)]
#[case(0.8)]
#[case(1.0)]
fn test_opacity_linearity(#[case] opacity: f32) {
    let base = white_base(400, 400);
    let settings = image_settings(solid_mark(40, 40), 10.0)
        .with_anchor(Anchor::TopLeft)
        .with_opacity(opacity);

    let (output, _) = Compositor::new().render_image(&base, &settings);

    // Watermark occupies [20, 60) x [20, 60)
    let expected = 255.0 * (1.0 - opacity);
    let inside = output.get_pixel(40, 40);
    assert!(
        (inside[0] as f32 - expected).abs() <= 1.0,
        "opacity {} gave {} (expected {})",
        opacity,
        inside[0],
        expected
    );
    assert_eq!(inside[3], 255);

    for (x, y) in changed_pixels(&base, &output) {
        assert!((20..60).contains(&x) && (20..60).contains(&y));
    }
}

// Test: Drawn image width follows the scale and keeps the aspect ratio
#[test]
fn test_image_width_and_aspect() {
    let base = white_base(1000, 600);
    // 20% of 1000 = 200 wide; 200 * 100 / 300 = 66.7 -> 67 tall
    let settings = image_settings(solid_mark(300, 100), 20.0).with_anchor(Anchor::TopLeft);

    let (output, _) = Compositor::new().render_image(&base, &settings);

    let changed: Vec<(u32, u32)> = changed_pixels(&base, &output).collect();
    let min_x = changed.iter().map(|(x, _)| *x).min().unwrap();
    let max_x = changed.iter().map(|(x, _)| *x).max().unwrap();
    let min_y = changed.iter().map(|(_, y)| *y).min().unwrap();
    let max_y = changed.iter().map(|(_, y)| *y).max().unwrap();

    assert_eq!((min_x, min_y), (50, 50));
    assert_eq!(max_x - min_x + 1, 200);
    assert_eq!(max_y - min_y + 1, 67);
}

// Test: Image kind without an image leaves the base untouched in both modes
#[rstest]
#[case(false)]
#[case(true)]
fn test_missing_image_renders_base(#[case] tiled: bool) {
    let base = RgbaImage::from_fn(50, 40, |x, y| Rgba([x as u8, y as u8, 7, 255]));
    let settings = WatermarkSettings::default()
        .with_kind(WatermarkKind::Image)
        .with_tiled(tiled);

    let (output, report) = Compositor::new().render_image(&base, &settings);

    assert_eq!(output, base);
    assert!(!report.layer_drawn);
}

// Test: Removing the image after a render restores the base on the next render
#[test]
fn test_clearing_image_restores_base() {
    let base = white_base(200, 200);
    let compositor = Compositor::new();
    let mut target = RenderTarget::new();

    let with_image = image_settings(solid_mark(20, 20), 10.0);
    compositor.render(&base, &mut target, &with_image);
    assert_ne!(target.image(), &base);

    compositor.render(&base, &mut target, &with_image.without_watermark_image());
    assert_eq!(target.image(), &base);
}

// Test: Degenerate tile spacing hits the cap instead of looping forever
#[test]
fn test_tile_cap_fails_closed() {
    let base = white_base(2000, 2000);
    let policy = TilePolicy {
        max_tiles: 100,
        ..TilePolicy::default()
    };
    let settings = image_settings(solid_mark(10, 10), 1.0)
        .with_tiled(true)
        .with_gap(0.0);

    let (_, report) = Compositor::with_policy(policy).render_image(&base, &settings);

    assert!(report.capped);
    assert_eq!(report.tiles_drawn + report.tiles_skipped, 100);
}

// Test: Every canvas point lies within half a tile of some tile center
#[test]
fn test_tile_centers_cover_canvas() {
    let image = ImageDimensions::new(900, 500);
    let grid = TileGrid::new(
        &image,
        &WatermarkDimensions::new(180.0, 45.0),
        20.0,
        &TilePolicy::default(),
    );
    let centers: Vec<(f64, f64)> = grid
        .placements(f64::INFINITY)
        .map(|cell| (cell.x, cell.y))
        .collect();

    for py in (0..=image.height).step_by(25) {
        for px in (0..=image.width).step_by(25) {
            let (px, py) = (px as f64, py as f64);
            let covered = centers.iter().any(|(cx, cy)| {
                (px - cx).abs() <= grid.spacing_x / 2.0 && (py - cy).abs() <= grid.spacing_y / 2.0
            });
            assert!(covered, "({}, {}) is not near any tile", px, py);
        }
    }
}

// Test: A tall canvas still gets tiles when the cap is reached
#[test]
fn test_tile_cap_on_tall_canvas_draws_on_canvas() {
    // 1% of 400 = 4px mark, spacing 8 x 12 gives ~25k cells on the canvas
    let base = white_base(400, 6000);
    let settings = image_settings(solid_mark(10, 10), 1.0)
        .with_tiled(true)
        .with_gap(0.0);

    let (output, report) = Compositor::new().render_image(&base, &settings);

    assert!(report.capped);
    assert!(report.tiles_drawn > 0);
    let changed: Vec<(u32, u32)> = changed_pixels(&base, &output).collect();
    assert!(!changed.is_empty());
    assert!(changed.iter().any(|(_, y)| *y < 100));
}

// Test: Tiny tiled text under a tight cap lands on the canvas
#[test]
fn test_capped_text_tiles_reach_canvas() {
    let base = white_base(1000, 10_000);
    let policy = TilePolicy {
        max_tiles: 500,
        ..TilePolicy::default()
    };
    let settings = WatermarkSettings::default()
        .with_text("Tiny")
        .with_color(Color::black())
        .with_opacity(1.0)
        .with_font_size(1.0)
        .with_tiled(true)
        .with_gap(0.0);

    let (output, report) = Compositor::with_policy(policy).render_image(&base, &settings);

    assert!(report.capped);
    assert!(report.tiles_drawn > 0);
    assert_eq!(report.tiles_drawn + report.tiles_skipped, 500);
    assert!(changed_pixels(&base, &output).any(|(_, y)| y < 200));
}

// Test: Glyph ink left of the pen position is not clipped
#[test]
fn test_text_ink_left_of_box_is_drawn() {
    // "J" in the bundled bold face starts left of its advance box
    let base = white_base(1000, 600);
    let settings = WatermarkSettings::default()
        .with_text("J")
        .with_color(Color::black())
        .with_opacity(1.0)
        .with_font_size(20.0)
        .with_anchor(Anchor::TopLeft);

    let (output, report) = Compositor::new().render_image(&base, &settings);
    assert!(report.layer_drawn);

    // The box starts at the 50px inset; 20% of 1000 = 200px em
    let min_x = changed_pixels(&base, &output).map(|(x, _)| x).min().unwrap();
    assert!(min_x < 45, "leftmost ink at x={}", min_x);
}
