//! Stroked seven-segment glyphs for numeric labels.
//!
//! Labels on contours and colorbar ticks only ever need digits, a sign and
//! a decimal point, so they are drawn as line segments instead of going
//! through a font rasterizer.

use tiny_skia::{FillRule, LineCap, LineJoin, PathBuilder, Pixmap, Stroke, Transform};

use crate::colormap::Color;

/// Glyph width relative to the glyph height.
const WIDTH_RATIO: f32 = 0.6;
/// Gap between glyphs relative to the glyph height.
const SPACING_RATIO: f32 = 0.1;

/// How a label is drawn.
#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    /// Glyph height in pixels
    pub size: f32,
    pub color: Color,
    /// Box filled behind the text for readability
    pub background: Option<Color>,
}

/// One stroke of a glyph, from one point to another.
pub type GlyphSegment = ((f32, f32), (f32, f32));

/// Line segments of a glyph centered on the origin, `y` down.
pub fn glyph_segments(ch: char, half_w: f32, half_h: f32) -> Vec<GlyphSegment> {
    let (l, r, t, b) = (-half_w, half_w, -half_h, half_h);
    let top = ((l, t), (r, t));
    let middle = ((l, 0.0), (r, 0.0));
    let bottom = ((l, b), (r, b));
    let upper_left = ((l, t), (l, 0.0));
    let upper_right = ((r, t), (r, 0.0));
    let lower_left = ((l, 0.0), (l, b));
    let lower_right = ((r, 0.0), (r, b));

    match ch {
        '0' => vec![top, upper_right, lower_right, bottom, lower_left, upper_left],
        '1' => vec![((0.0, t), (0.0, b))],
        '2' => vec![top, upper_right, middle, lower_left, bottom],
        '3' => vec![top, upper_right, middle, lower_right, bottom],
        '4' => vec![upper_left, middle, upper_right, lower_right],
        '5' => vec![top, upper_left, middle, lower_right, bottom],
        '6' => vec![top, upper_left, lower_left, bottom, lower_right, middle],
        '7' => vec![top, ((r, t), (0.0, b))],
        '8' => vec![top, upper_right, lower_right, bottom, lower_left, upper_left, middle],
        '9' => vec![middle, upper_left, top, upper_right, lower_right, bottom],
        '-' => vec![middle],
        '+' => vec![middle, ((0.0, t * 0.6), (0.0, b * 0.6))],
        '.' => vec![((0.0, b * 0.8), (0.0, b))],
        _ => vec![],
    }
}

/// Width in pixels of `text` at glyph height `size`.
pub fn text_width(text: &str, size: f32) -> f32 {
    let n = text.chars().count() as f32;
    if n == 0.0 {
        return 0.0;
    }
    let char_width = size * WIDTH_RATIO;
    let spacing = size * SPACING_RATIO;
    n * (char_width + spacing) - spacing
}

/// Draw `text` centered on `(x, y)` and rotated by `angle` radians.
pub fn draw_text(pixmap: &mut Pixmap, x: f32, y: f32, angle: f32, text: &str, style: &TextStyle) {
    let char_width = style.size * WIDTH_RATIO;
    let char_spacing = style.size * SPACING_RATIO;
    let width = text_width(text, style.size);
    let (sin_a, cos_a) = angle.sin_cos();
    let rotate = |px: f32, py: f32| (px * cos_a - py * sin_a + x, px * sin_a + py * cos_a + y);

    if let Some(background) = style.background {
        let pad = style.size * 0.3;
        let half_w = width / 2.0 + pad;
        let half_h = style.size / 2.0 + pad;

        let mut pb = PathBuilder::new();
        let corners = [(-half_w, -half_h), (half_w, -half_h), (half_w, half_h), (-half_w, half_h)];
        for (i, &(cx, cy)) in corners.iter().enumerate() {
            let (rx, ry) = rotate(cx, cy);
            if i == 0 {
                pb.move_to(rx, ry);
            } else {
                pb.line_to(rx, ry);
            }
        }
        pb.close();
        if let Some(path) = pb.finish() {
            pixmap.fill_path(&path, &background.paint(), FillRule::Winding, Transform::identity(), None);
        }
    }

    let stroke = Stroke {
        width: (style.size * 0.12).max(1.0),
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };
    let paint = style.color.paint();
    let half_w = char_width / 2.0;
    let half_h = style.size / 2.0;

    // Build the whole label as one path so overlapping strokes don't double up
    let mut pb = PathBuilder::new();
    let start_x = -width / 2.0 + half_w;
    for (i, ch) in text.chars().enumerate() {
        let cx = start_x + i as f32 * (char_width + char_spacing);
        for ((x1, y1), (x2, y2)) in glyph_segments(ch, half_w, half_h) {
            let (rx1, ry1) = rotate(cx + x1, y1);
            let (rx2, ry2) = rotate(cx + x2, y2);
            pb.move_to(rx1, ry1);
            pb.line_to(rx2, ry2);
        }
    }
    if let Some(path) = pb.finish() {
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
}
