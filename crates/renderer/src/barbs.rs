//! Wind barb rendering.
//!
//! Barbs are drawn as vector strokes. The staff points toward the direction
//! the wind blows from. Feathers sit on the clockwise side of the staff
//! (the standard northern-hemisphere convention): a pennant per 50 kt, a
//! full barb per 10 kt and a half barb for a remaining 5 kt. Speeds under
//! 2.5 kt are drawn as a calm circle.

use std::f64::consts::PI;

use projection::{local_axes, MapProjection};
use sos_common::FieldSlice;
use tiny_skia::{FillRule, LineCap, LineJoin, PathBuilder, Pixmap, Stroke, Transform};

use crate::colormap::Color;

/// Speeds below this are calm, in knots.
const CALM_KNOTS: f32 = 2.5;

/// Configuration for wind barb rendering
#[derive(Debug, Clone)]
pub struct BarbConfig {
    /// Draw a barb at every `stride`-th grid point in each direction
    pub stride: usize,
    /// Staff length in pixels
    pub length: f32,
    pub line_width: f32,
    pub color: Color,
    /// Put feathers on the counter-clockwise side south of the equator
    pub flip_southern: bool,
}

impl Default for BarbConfig {
    fn default() -> Self {
        Self {
            stride: 4,
            length: 18.0,
            line_width: 1.2,
            color: Color::BLACK,
            flip_southern: false,
        }
    }
}

/// Convert U and V wind components to speed and direction (radians FROM)
///
/// Returns (speed, direction_rad) where:
/// - speed: in the unit of the components
/// - direction_rad: math angle (counter-clockwise from east) of the
///   direction the wind blows FROM, in `[0, 2π)`
pub fn uv_to_speed_direction(u: f32, v: f32) -> (f64, f64) {
    let u = u as f64;
    let v = v as f64;

    let speed = (u * u + v * v).sqrt();

    // Wind from the west (u > 0) points the staff west, i.e. angle π
    let mut direction = (-v).atan2(-u);
    if direction < 0.0 {
        direction += 2.0 * PI;
    }

    (speed, direction)
}

/// Feathers making up one barb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feathers {
    pub pennants: u32,
    pub full: u32,
    pub half: u32,
}

impl Feathers {
    /// Feathers for a speed in knots, rounded to the nearest 5 kt. `None`
    /// means calm.
    pub fn for_speed(speed_kt: f32) -> Option<Self> {
        if !speed_kt.is_finite() || speed_kt < CALM_KNOTS {
            return None;
        }
        let rounded = ((speed_kt / 5.0).round() * 5.0) as u32;
        let pennants = rounded / 50;
        let rest = rounded % 50;
        Some(Self {
            pennants,
            full: rest / 10,
            half: u32::from(rest % 10 >= 5),
        })
    }

    /// Speed represented, in knots.
    pub fn knots(&self) -> u32 {
        self.pennants * 50 + self.full * 10 + self.half * 5
    }
}

/// Grid indices `(i, j)` that get a barb.
///
/// Every `stride`-th point starting at `stride / 2`, so barbs sit away
/// from the poles. The duplicated cyclic column is skipped.
pub fn barb_positions(width: usize, height: usize, stride: usize, cyclic: bool) -> Vec<(usize, usize)> {
    let stride = stride.max(1);
    let columns = if cyclic { width.saturating_sub(1) } else { width };
    let offset = stride / 2;

    (offset..height)
        .step_by(stride)
        .flat_map(|j| (offset..columns).step_by(stride).map(move |i| (i, j)))
        .collect()
}

/// Draw barbs for a pair of wind slices in knots. Returns the number drawn.
pub fn draw_wind_barbs<P: MapProjection + ?Sized>(
    pixmap: &mut Pixmap,
    proj: &P,
    u: &FieldSlice,
    v: &FieldSlice,
    config: &BarbConfig,
) -> usize {
    let mut drawn = 0;

    for (i, j) in barb_positions(u.width(), u.height(), config.stride, u.is_cyclic()) {
        let (uu, vv) = (u.value(i, j), v.value(i, j));
        if uu.is_nan() || vv.is_nan() {
            continue;
        }

        let (lon, lat) = (u.lon[i], u.lat[j]);
        let Some(origin) = proj.project(lon, lat) else {
            continue;
        };
        // Poles have no east direction on cylindrical maps
        let Some((east, north)) = local_axes(proj, lon, lat) else {
            continue;
        };

        let origin = (origin.0 as f32, origin.1 as f32);
        let (speed, direction) = uv_to_speed_direction(uu, vv);
        match Feathers::for_speed(speed as f32) {
            None => draw_calm(pixmap, origin, config),
            Some(feathers) => {
                let (de, dn) = (direction.cos(), direction.sin());
                let staff = to_screen(east, north, de, dn);
                // Clockwise of the staff in east/north space
                let mut side = to_screen(east, north, dn, -de);
                if config.flip_southern && lat < 0.0 {
                    side = (-side.0, -side.1);
                }
                draw_barb(pixmap, origin, staff, side, feathers, config);
            }
        }
        drawn += 1;
    }

    tracing::debug!(barbs = drawn, stride = config.stride, "Rendered wind barbs");
    drawn
}

/// Screen vector for a direction given in east/north components.
fn to_screen(east: (f64, f64), north: (f64, f64), e: f64, n: f64) -> (f32, f32) {
    let x = east.0 * e + north.0 * n;
    let y = east.1 * e + north.1 * n;
    let len = (x * x + y * y).sqrt().max(1e-12);
    ((x / len) as f32, (y / len) as f32)
}

fn barb_stroke(config: &BarbConfig) -> Stroke {
    Stroke {
        width: config.line_width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    }
}

fn draw_calm(pixmap: &mut Pixmap, origin: (f32, f32), config: &BarbConfig) {
    let radius = (config.length * 0.15).max(1.5);
    if let Some(circle) = PathBuilder::from_circle(origin.0, origin.1, radius) {
        pixmap.stroke_path(
            &circle,
            &config.color.paint(),
            &barb_stroke(config),
            Transform::identity(),
            None,
        );
    }
}

/// Draw one barb. `staff` and `side` are unit screen vectors.
fn draw_barb(
    pixmap: &mut Pixmap,
    origin: (f32, f32),
    staff: (f32, f32),
    side: (f32, f32),
    feathers: Feathers,
    config: &BarbConfig,
) {
    let length = config.length;
    let spacing = length * 0.14;
    let feather_len = length * 0.4;
    // Feathers lean toward the tip
    let lean = feather_len * 0.25;

    let along = |d: f32| (origin.0 + staff.0 * d, origin.1 + staff.1 * d);
    let offset = |p: (f32, f32), s: f32, l: f32| {
        (p.0 + side.0 * s + staff.0 * l, p.1 + side.1 * s + staff.1 * l)
    };

    let mut lines = PathBuilder::new();
    let tip = along(length);
    lines.move_to(origin.0, origin.1);
    lines.line_to(tip.0, tip.1);

    let mut flags = PathBuilder::new();
    let mut d = length;
    for _ in 0..feathers.pennants {
        let base = along(d);
        let inner = along(d - spacing);
        let apex = offset(inner, feather_len, spacing * 0.5);
        flags.move_to(base.0, base.1);
        flags.line_to(apex.0, apex.1);
        flags.line_to(inner.0, inner.1);
        flags.close();
        d -= spacing * 1.25;
    }
    if feathers.pennants > 0 {
        d -= spacing * 0.25;
    }

    for _ in 0..feathers.full {
        let base = along(d);
        let end = offset(base, feather_len, lean);
        lines.move_to(base.0, base.1);
        lines.line_to(end.0, end.1);
        d -= spacing;
    }

    if feathers.half > 0 {
        // A lone half barb is set in from the tip so it isn't read as a full one
        if feathers.pennants == 0 && feathers.full == 0 {
            d -= spacing;
        }
        let base = along(d);
        let end = offset(base, feather_len * 0.5, lean * 0.5);
        lines.move_to(base.0, base.1);
        lines.line_to(end.0, end.1);
    }

    let paint = config.color.paint();
    if let Some(path) = lines.finish() {
        pixmap.stroke_path(&path, &paint, &barb_stroke(config), Transform::identity(), None);
    }
    if let Some(path) = flags.finish() {
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uv_to_speed_direction_north_wind() {
        // Wind FROM the north points the staff up (π/2)
        let (speed, dir) = uv_to_speed_direction(0.0, -10.0);
        assert!((speed - 10.0).abs() < 0.01);
        assert!((dir - PI / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_uv_to_speed_direction_west_wind() {
        let (_, dir) = uv_to_speed_direction(10.0, 0.0);
        assert!((dir - PI).abs() < 1e-9);
    }

    #[test]
    fn test_feathers_rounding() {
        assert_eq!(Feathers::for_speed(0.0), None);
        assert_eq!(Feathers::for_speed(2.4), None);
        assert_eq!(
            Feathers::for_speed(2.5),
            Some(Feathers { pennants: 0, full: 0, half: 1 })
        );
        assert_eq!(
            Feathers::for_speed(12.0),
            Some(Feathers { pennants: 0, full: 1, half: 0 })
        );
        assert_eq!(
            Feathers::for_speed(13.0),
            Some(Feathers { pennants: 0, full: 1, half: 1 })
        );
        assert_eq!(
            Feathers::for_speed(67.6),
            Some(Feathers { pennants: 1, full: 2, half: 0 })
        );
        assert_eq!(Feathers::for_speed(147.0).map(|f| f.knots()), Some(145));
        assert_eq!(Feathers::for_speed(f32::NAN), None);
    }

    #[test]
    fn test_barb_positions_stride() {
        let positions = barb_positions(8, 5, 2, false);
        assert_eq!(positions[0], (1, 1));
        assert_eq!(positions.len(), 4 * 2);
        assert!(positions.iter().all(|&(i, j)| i % 2 == 1 && j % 2 == 1));
    }

    #[test]
    fn test_barb_positions_skip_cyclic_column() {
        let positions = barb_positions(5, 1, 1, true);
        assert_eq!(positions, vec![(0, 0), (1, 0), (2, 0), (3, 0)]);
    }
}
