//! Contour line (isoline) generation using the marching squares algorithm.
//!
//! Contours are traced in grid index space, smoothed, and then mapped to
//! geographic coordinates so they can be drawn through any
//! [`MapProjection`]. Labels are placed along the projected lines.

use std::f32::consts::{FRAC_PI_2, PI};

use projection::MapProjection;
use sos_common::FieldSlice;
use tiny_skia::Pixmap;

use crate::colormap::Color;
use crate::glyphs::{self, TextStyle};
use crate::polyline::{project_polyline, stroke_polyline};

/// Tolerance for joining segment end points, in grid cells.
const JOIN_EPSILON: f32 = 0.001;

/// A point in 2D space (grid or pixel coordinates)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn distance(&self, other: &Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A line segment between two points
#[derive(Debug, Clone)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

/// A complete contour line (polyline) in grid space
#[derive(Debug, Clone)]
pub struct Contour {
    pub level: f32,
    pub points: Vec<Point>,
    pub closed: bool,
}

/// A contour line in geographic coordinates, `(lon, lat)` per point.
#[derive(Debug, Clone)]
pub struct GeoContour {
    pub level: f32,
    pub points: Vec<(f64, f64)>,
    pub closed: bool,
}

/// How contour lines and their labels are drawn.
#[derive(Debug, Clone)]
pub struct ContourStyle {
    pub color: Color,
    /// Line width in pixels
    pub line_width: f32,
    /// Number of Chaikin smoothing passes (0 = no smoothing)
    pub smoothing_passes: u32,
    pub labels_enabled: bool,
    /// Label glyph height in pixels
    pub label_size: f32,
    /// Target distance between labels along a line, in pixels
    pub label_spacing: f32,
    /// Box drawn behind each label
    pub label_background: Option<Color>,
}

impl Default for ContourStyle {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            line_width: 1.5,
            smoothing_passes: 1,
            labels_enabled: true,
            label_size: 10.0,
            label_spacing: 300.0,
            label_background: Some(Color::new(255, 255, 255, 200)),
        }
    }
}

/// Contour levels at every multiple of `interval` within `[min_value, max_value]`.
pub fn generate_contour_levels(min_value: f32, max_value: f32, interval: f32) -> Vec<f32> {
    if !(interval > 0.0) || !(max_value > min_value) {
        return vec![];
    }

    // Index the levels instead of accumulating so long ranges don't drift
    let first = (min_value / interval).ceil() as i64;
    let last = (max_value / interval + 1e-4).floor() as i64;
    (first..=last).map(|k| k as f32 * interval).collect()
}

/// Label text for a contour level.
pub fn format_level(level: f32) -> String {
    if (level - level.round()).abs() < 0.01 {
        format!("{:.0}", level)
    } else {
        format!("{:.1}", level)
    }
}

/// Marching squares algorithm to generate contour segments
///
/// # Arguments
/// * `data` - Grid data in row-major order
/// * `width` - Grid width
/// * `height` - Grid height
/// * `level` - Contour level to extract
pub fn march_squares(data: &[f32], width: usize, height: usize, level: f32) -> Vec<Segment> {
    if width < 2 || height < 2 || data.len() != width * height {
        return vec![];
    }

    let mut segments = Vec::new();

    for y in 0..(height - 1) {
        for x in 0..(width - 1) {
            let tl = data[y * width + x];
            let tr = data[y * width + x + 1];
            let bl = data[(y + 1) * width + x];
            let br = data[(y + 1) * width + x + 1];

            // Cells touching a missing value produce nothing
            if tl.is_nan() || tr.is_nan() || bl.is_nan() || br.is_nan() {
                continue;
            }

            let mut cell_index = 0u8;
            if tl >= level {
                cell_index |= 1;
            }
            if tr >= level {
                cell_index |= 2;
            }
            if br >= level {
                cell_index |= 4;
            }
            if bl >= level {
                cell_index |= 8;
            }

            push_cell_segments(
                &mut segments,
                cell_index,
                x as f32,
                y as f32,
                [tl, tr, br, bl],
                level,
            );
        }
    }

    segments
}

/// Append the segments of one marching squares cell.
fn push_cell_segments(
    out: &mut Vec<Segment>,
    cell_index: u8,
    x: f32,
    y: f32,
    corners: [f32; 4],
    level: f32,
) {
    let [tl, tr, br, bl] = corners;
    let top = || interpolate_edge(x, y, x + 1.0, y, tl, tr, level);
    let right = || interpolate_edge(x + 1.0, y, x + 1.0, y + 1.0, tr, br, level);
    let bottom = || interpolate_edge(x, y + 1.0, x + 1.0, y + 1.0, bl, br, level);
    let left = || interpolate_edge(x, y, x, y + 1.0, tl, bl, level);
    let mut seg = |start: Point, end: Point| out.push(Segment { start, end });

    match cell_index {
        0 | 15 => {}
        1 | 14 => seg(left(), top()),
        2 | 13 => seg(top(), right()),
        3 | 12 => seg(left(), right()),
        4 | 11 => seg(right(), bottom()),
        6 | 9 => seg(top(), bottom()),
        7 | 8 => seg(left(), bottom()),
        5 | 10 => {
            // Saddle: resolve with the cell-center average
            let center = (tl + tr + br + bl) / 4.0;
            let center_high = center >= level;
            if (cell_index == 5) == center_high {
                seg(left(), bottom());
                seg(top(), right());
            } else {
                seg(left(), top());
                seg(right(), bottom());
            }
        }
        _ => {}
    }
}

/// Linearly interpolate between two edge points based on data values
fn interpolate_edge(x1: f32, y1: f32, x2: f32, y2: f32, val1: f32, val2: f32, level: f32) -> Point {
    if (val2 - val1).abs() < 1e-6 {
        return Point::new((x1 + x2) / 2.0, (y1 + y2) / 2.0);
    }

    let t = ((level - val1) / (val2 - val1)).clamp(0.0, 1.0);
    Point::new(x1 + t * (x2 - x1), y1 + t * (y2 - y1))
}

/// Connect line segments into continuous polylines.
///
/// Lines are grown from both ends, so an unordered set of segments from a
/// single isoline becomes one polyline.
pub fn connect_segments(segments: Vec<Segment>) -> Vec<Contour> {
    let mut contours = Vec::new();
    let mut used = vec![false; segments.len()];

    // Find an unused segment touching `p` and return its other end
    let take_neighbor = |used: &mut Vec<bool>, p: Point| -> Option<Point> {
        for (i, seg) in segments.iter().enumerate() {
            if used[i] {
                continue;
            }
            if seg.start.distance(&p) < JOIN_EPSILON {
                used[i] = true;
                return Some(seg.end);
            }
            if seg.end.distance(&p) < JOIN_EPSILON {
                used[i] = true;
                return Some(seg.start);
            }
        }
        None
    };

    for start_idx in 0..segments.len() {
        if used[start_idx] {
            continue;
        }
        used[start_idx] = true;

        let mut forward = vec![segments[start_idx].end];
        while let Some(next) = take_neighbor(&mut used, forward[forward.len() - 1]) {
            forward.push(next);
        }

        let mut backward = vec![segments[start_idx].start];
        while let Some(next) = take_neighbor(&mut used, backward[backward.len() - 1]) {
            backward.push(next);
        }

        backward.reverse();
        backward.extend(forward);
        let points = backward;

        let closed = points.len() > 2 && points[0].distance(&points[points.len() - 1]) < JOIN_EPSILON;
        contours.push(Contour {
            level: 0.0, // Level will be set by caller
            points,
            closed,
        });
    }

    contours
}

/// Apply Chaikin's corner cutting algorithm for smoothing
pub fn smooth_contour(contour: &Contour, iterations: u32) -> Contour {
    if iterations == 0 || contour.points.len() < 3 {
        return contour.clone();
    }

    let mut points = contour.points.clone();
    if contour.closed {
        // The duplicated closing point would create a zero-length edge
        points.pop();
    }

    for _ in 0..iterations {
        let n = points.len();
        let edges = if contour.closed { n } else { n - 1 };
        let mut new_points = Vec::with_capacity(edges * 2 + 2);

        if !contour.closed {
            new_points.push(points[0]);
        }
        for i in 0..edges {
            let p1 = points[i];
            let p2 = points[(i + 1) % n];
            new_points.push(Point::new(0.75 * p1.x + 0.25 * p2.x, 0.75 * p1.y + 0.25 * p2.y));
            new_points.push(Point::new(0.25 * p1.x + 0.75 * p2.x, 0.25 * p1.y + 0.75 * p2.y));
        }
        if !contour.closed {
            new_points.push(points[n - 1]);
        }

        points = new_points;
    }

    if contour.closed {
        points.push(points[0]);
    }

    Contour {
        level: contour.level,
        points,
        closed: contour.closed,
    }
}

/// Trace all levels over a grid.
pub fn generate_all_contours(
    data: &[f32],
    width: usize,
    height: usize,
    levels: &[f32],
    smoothing_passes: u32,
) -> Vec<Contour> {
    let mut all_contours = Vec::new();

    for &level in levels {
        let segments = march_squares(data, width, height, level);
        for mut contour in connect_segments(segments) {
            contour.level = level;
            if smoothing_passes > 0 {
                contour = smooth_contour(&contour, smoothing_passes);
            }
            all_contours.push(contour);
        }
    }

    all_contours
}

/// Contours of a field slice in geographic coordinates.
pub fn geo_contours(slice: &FieldSlice, levels: &[f32], smoothing_passes: u32) -> Vec<GeoContour> {
    let contours = generate_all_contours(
        &slice.data,
        slice.width(),
        slice.height(),
        levels,
        smoothing_passes,
    );

    tracing::debug!(
        field = %slice.name,
        levels = levels.len(),
        contours = contours.len(),
        points = contours.iter().map(|c| c.points.len()).sum::<usize>(),
        "Generated contours"
    );

    contours
        .into_iter()
        .map(|c| GeoContour {
            level: c.level,
            points: c
                .points
                .iter()
                .map(|p| slice.grid_to_geo(p.x as f64, p.y as f64))
                .collect(),
            closed: c.closed,
        })
        .collect()
}

/// Position and metadata for a contour label
#[derive(Debug, Clone)]
pub struct LabelPosition {
    pub x: f32,
    pub y: f32,
    /// Rotation angle in radians
    pub angle: f32,
    pub text: String,
}

/// Project, stroke and label contours on a canvas.
///
/// Lines are split where they leave the visible globe or cross the map seam.
/// Returns the number of labels drawn.
pub fn draw_geo_contours<P: MapProjection + ?Sized>(
    pixmap: &mut Pixmap,
    proj: &P,
    contours: &[GeoContour],
    style: &ContourStyle,
) -> usize {
    let (width, height) = (pixmap.width() as f32, pixmap.height() as f32);
    let mut labels: Vec<LabelPosition> = Vec::new();

    for contour in contours {
        for part in project_polyline(proj, &contour.points) {
            stroke_polyline(pixmap, &part, style.color, style.line_width);
            if style.labels_enabled {
                collect_label_positions(
                    &part,
                    &format_level(contour.level),
                    style,
                    &mut labels,
                    width,
                    height,
                );
            }
        }
    }

    let text_style = TextStyle {
        size: style.label_size,
        color: style.color,
        background: style.label_background,
    };
    for label in &labels {
        glyphs::draw_text(pixmap, label.x, label.y, label.angle, &label.text, &text_style);
    }
    labels.len()
}

/// Total length of a screen polyline
fn polyline_length(points: &[Point]) -> f32 {
    points.windows(2).map(|w| w[0].distance(&w[1])).sum()
}

/// Collect label positions along a projected contour line.
pub fn collect_label_positions(
    points: &[Point],
    text: &str,
    style: &ContourStyle,
    positions: &mut Vec<LabelPosition>,
    width: f32,
    height: f32,
) {
    let total_length = polyline_length(points);
    if total_length < style.label_spacing * 0.5 {
        return; // Too short for a label
    }

    let margin = style.label_size * 2.0;
    let num_labels = ((total_length / style.label_spacing).floor() as usize).max(1);
    let spacing = total_length / (num_labels as f32 + 1.0);
    let min_distance = style.label_size * 4.0;

    let mut accumulated_length = 0.0;
    let mut next_label_at = spacing;
    let mut label_count = 0;

    for pair in points.windows(2) {
        if label_count >= num_labels {
            break;
        }

        let (p1, p2) = (pair[0], pair[1]);
        let dx = p2.x - p1.x;
        let dy = p2.y - p1.y;
        let segment_length = (dx * dx + dy * dy).sqrt();

        while segment_length > 0.0
            && accumulated_length + segment_length >= next_label_at
            && label_count < num_labels
        {
            let t = (next_label_at - accumulated_length) / segment_length;
            let x = p1.x + t * dx;
            let y = p1.y + t * dy;

            let inside = x > margin && x < width - margin && y > margin && y < height - margin;
            let crowded = positions
                .iter()
                .any(|pos| (pos.x - x).powi(2) + (pos.y - y).powi(2) < min_distance * min_distance);

            if inside && !crowded {
                // Keep text upright
                let mut angle = dy.atan2(dx);
                if angle > FRAC_PI_2 {
                    angle -= PI;
                } else if angle < -FRAC_PI_2 {
                    angle += PI;
                }
                positions.push(LabelPosition {
                    x,
                    y,
                    angle,
                    text: text.to_string(),
                });
            }

            next_label_at += spacing;
            label_count += 1;
        }

        accumulated_length += segment_length;
    }
}
