//! Projecting geographic polylines to screen space and stroking them.

use projection::MapProjection;
use tiny_skia::{LineCap, LineJoin, PathBuilder, Pixmap, Stroke, Transform};

use crate::colormap::Color;
use crate::contour::Point;

/// Project a `(lon, lat)` polyline into screen-space pieces.
///
/// A new piece starts wherever a point is not visible and wherever
/// consecutive points land on opposite sides of a wrapping map's seam. At a
/// seam the line is carried to the image edge on both sides so it meets up
/// when the texture is wrapped on the sphere.
pub fn project_polyline<P: MapProjection + ?Sized>(proj: &P, points: &[(f64, f64)]) -> Vec<Vec<Point>> {
    let (width, _) = proj.size();
    let width = width as f64;

    let mut parts = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    let mut previous: Option<(f64, f64)> = None;

    for &(lon, lat) in points {
        let Some(screen) = proj.project(lon, lat) else {
            flush(&mut parts, &mut current);
            previous = None;
            continue;
        };

        if let Some(prev) = previous {
            if proj.is_seam_jump(prev, screen) {
                // Unwrap the new point next to the previous one and cut at the edge
                let (edge_out, edge_in, unwrapped_x) = if prev.0 > screen.0 {
                    (width, 0.0, screen.0 + width)
                } else {
                    (0.0, width, screen.0 - width)
                };
                let t = (edge_out - prev.0) / (unwrapped_x - prev.0);
                let y = prev.1 + t * (screen.1 - prev.1);
                current.push(Point::new(edge_out as f32, y as f32));
                flush(&mut parts, &mut current);
                current.push(Point::new(edge_in as f32, y as f32));
            }
        }

        current.push(Point::new(screen.0 as f32, screen.1 as f32));
        previous = Some(screen);
    }
    flush(&mut parts, &mut current);

    parts
}

fn flush(parts: &mut Vec<Vec<Point>>, current: &mut Vec<Point>) {
    if current.len() >= 2 {
        parts.push(std::mem::take(current));
    } else {
        current.clear();
    }
}

/// Stroke an open polyline with round caps and joins.
pub fn stroke_polyline(pixmap: &mut Pixmap, points: &[Point], color: Color, width: f32) {
    if points.len() < 2 {
        return;
    }

    let mut pb = PathBuilder::new();
    pb.move_to(points[0].x, points[0].y);
    for p in &points[1..] {
        pb.line_to(p.x, p.y);
    }

    let stroke = Stroke {
        width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };

    if let Some(path) = pb.finish() {
        pixmap.stroke_path(&path, &color.paint(), &stroke, Transform::identity(), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use projection::{Equirectangular, Orthographic};

    #[test]
    fn test_straight_line_is_one_part() {
        let proj = Equirectangular::global(360, 180, 0.0).unwrap();
        let parts = project_polyline(&proj, &[(-10.0, 0.0), (0.0, 0.0), (10.0, 0.0)]);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].len(), 3);
    }

    #[test]
    fn test_dateline_crossing_splits_at_edges() {
        let proj = Equirectangular::global(360, 180, 0.0).unwrap();
        let parts = project_polyline(&proj, &[(170.0, 10.0), (-170.0, 20.0)]);
        assert_eq!(parts.len(), 2);

        let east = &parts[0];
        let west = &parts[1];
        assert_eq!(east[east.len() - 1].x, 360.0);
        assert_eq!(west[0].x, 0.0);
        // Crossing is halfway between 10°N and 20°N, i.e. y = 90 - 15
        assert!((east[east.len() - 1].y - 75.0).abs() < 1e-4);
        assert!((west[0].y - 75.0).abs() < 1e-4);
    }

    #[test]
    fn test_westward_crossing() {
        let proj = Equirectangular::global(360, 180, 0.0).unwrap();
        let parts = project_polyline(&proj, &[(-175.0, 0.0), (175.0, 0.0)]);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0][1].x, 0.0);
        assert_eq!(parts[1][0].x, 360.0);
    }

    #[test]
    fn test_hidden_points_break_line() {
        let proj = Orthographic::new(200, 0.0, 0.0).unwrap();
        let line = [(-20.0, 0.0), (0.0, 0.0), (120.0, 0.0), (10.0, 5.0), (20.0, 5.0)];
        let parts = project_polyline(&proj, &line);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].len(), 2);
        assert_eq!(parts[1].len(), 2);
    }

    #[test]
    fn test_stroke_marks_pixels() {
        let mut pixmap = Pixmap::new(20, 20).unwrap();
        stroke_polyline(
            &mut pixmap,
            &[Point::new(0.0, 10.0), Point::new(20.0, 10.0)],
            Color::BLACK,
            2.0,
        );
        assert!(pixmap.pixel(10, 10).unwrap().alpha() > 0);
        assert_eq!(pixmap.pixel(10, 0).unwrap().alpha(), 0);
    }
}
