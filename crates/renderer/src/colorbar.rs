//! Standalone colorbar for the filled temperature bands.
//!
//! SOS shows it as a picture-in-picture overlay, so it is drawn on a
//! transparent background: a horizontal bar with one box per band, pointed
//! ends for the open bands, and tick labels under the band edges.

use image::RgbaImage;
use tiny_skia::{FillRule, LineCap, LineJoin, PathBuilder, Pixmap, Stroke, Transform};

use crate::canvas::{new_pixmap, pixmap_to_image};
use crate::colormap::{BandScheme, Color};
use crate::contour::format_level;
use crate::error::{RenderError, RenderResult};
use crate::glyphs::{draw_text, text_width, TextStyle};

#[derive(Debug, Clone)]
pub struct ColorbarConfig {
    pub width: u32,
    pub height: u32,
    /// Label every n-th band edge
    pub label_every: usize,
    /// Color of the outline, edge ticks and labels
    pub text_color: Color,
}

impl Default for ColorbarConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 120,
            label_every: 2,
            text_color: Color::WHITE,
        }
    }
}

/// Horizontal geometry of the bar, in pixels.
#[derive(Debug, Clone, Copy)]
struct Layout {
    bar_left: f32,
    bar_right: f32,
    bar_top: f32,
    bar_height: f32,
    triangle: f32,
    label_size: f32,
}

impl Layout {
    fn new(scheme: &BandScheme, config: &ColorbarConfig) -> RenderResult<Self> {
        let (w, h) = (config.width as f32, config.height as f32);
        let bar_top = (h * 0.08).max(1.0);
        let bar_height = h * 0.45;
        let triangle = bar_height;
        let label_size = h * 0.28;

        let widest = scheme
            .levels()
            .iter()
            .map(|&l| text_width(&format_level(l), label_size))
            .fold(0.0f32, f32::max);
        let margin = (widest / 2.0 - triangle).max(4.0);

        let bar_left = margin + triangle;
        let bar_right = w - margin - triangle;
        if bar_right <= bar_left {
            return Err(RenderError::InvalidSize {
                width: config.width,
                height: config.height,
            });
        }

        Ok(Self {
            bar_left,
            bar_right,
            bar_top,
            bar_height,
            triangle,
            label_size,
        })
    }

    fn edge_x(&self, index: usize, bands: usize) -> f32 {
        self.bar_left + (self.bar_right - self.bar_left) * index as f32 / bands as f32
    }

    fn bar_bottom(&self) -> f32 {
        self.bar_top + self.bar_height
    }

    fn mid_y(&self) -> f32 {
        self.bar_top + self.bar_height / 2.0
    }
}

/// Render the colorbar for `scheme`.
pub fn render_colorbar(scheme: &BandScheme, config: &ColorbarConfig) -> RenderResult<RgbaImage> {
    let mut pixmap = new_pixmap(config.width, config.height)?;
    let layout = Layout::new(scheme, config)?;
    let bands = scheme.levels().len() - 1;
    let colors = scheme.colors();

    for k in 0..bands {
        let (x0, x1) = (layout.edge_x(k, bands), layout.edge_x(k + 1, bands));
        fill_polygon(
            &mut pixmap,
            &[
                (x0, layout.bar_top),
                (x1, layout.bar_top),
                (x1, layout.bar_bottom()),
                (x0, layout.bar_bottom()),
            ],
            colors[k + 1],
        );
    }

    let left_tip = layout.bar_left - layout.triangle;
    let right_tip = layout.bar_right + layout.triangle;
    let left_triangle = [
        (layout.bar_left, layout.bar_top),
        (left_tip, layout.mid_y()),
        (layout.bar_left, layout.bar_bottom()),
    ];
    let right_triangle = [
        (layout.bar_right, layout.bar_top),
        (right_tip, layout.mid_y()),
        (layout.bar_right, layout.bar_bottom()),
    ];
    fill_polygon(&mut pixmap, &left_triangle, scheme.below_color());
    fill_polygon(&mut pixmap, &right_triangle, scheme.above_color());

    // Outline and band edges
    let outline = [
        (layout.bar_left, layout.bar_top),
        (layout.bar_right, layout.bar_top),
        (right_tip, layout.mid_y()),
        (layout.bar_right, layout.bar_bottom()),
        (layout.bar_left, layout.bar_bottom()),
        (left_tip, layout.mid_y()),
    ];
    let mut pb = PathBuilder::new();
    pb.push_path_points(&outline, true);
    for i in 0..=bands {
        let x = layout.edge_x(i, bands);
        pb.move_to(x, layout.bar_top);
        pb.line_to(x, layout.bar_bottom());
    }
    let stroke = Stroke {
        width: (config.height as f32 * 0.015).max(1.0),
        line_cap: LineCap::Butt,
        line_join: LineJoin::Miter,
        ..Stroke::default()
    };
    if let Some(path) = pb.finish() {
        pixmap.stroke_path(&path, &config.text_color.paint(), &stroke, Transform::identity(), None);
    }

    let text = TextStyle {
        size: layout.label_size,
        color: config.text_color,
        background: None,
    };
    let label_y = layout.bar_bottom() + layout.label_size * 0.9;
    for (i, level) in scheme.levels().iter().enumerate().step_by(config.label_every.max(1)) {
        draw_text(&mut pixmap, layout.edge_x(i, bands), label_y, 0.0, &format_level(*level), &text);
    }

    tracing::debug!(
        width = config.width,
        height = config.height,
        bands = bands,
        "Rendered colorbar"
    );
    Ok(pixmap_to_image(&pixmap))
}

fn fill_polygon(pixmap: &mut Pixmap, points: &[(f32, f32)], color: Color) {
    let mut pb = PathBuilder::new();
    pb.push_path_points(points, true);
    if let Some(path) = pb.finish() {
        pixmap.fill_path(&path, &color.paint(), FillRule::Winding, Transform::identity(), None);
    }
}

/// Polyline helpers on top of tiny-skia's builder.
trait PathPoints {
    fn push_path_points(&mut self, points: &[(f32, f32)], close: bool);
}

impl PathPoints for PathBuilder {
    fn push_path_points(&mut self, points: &[(f32, f32)], close: bool) {
        for (i, &(x, y)) in points.iter().enumerate() {
            if i == 0 {
                self.move_to(x, y);
            } else {
                self.line_to(x, y);
            }
        }
        if close {
            self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colormap::ColorRamp;

    fn scheme() -> BandScheme {
        BandScheme::from_range(-40.0, 40.0, 10.0, &ColorRamp::viridis()).unwrap()
    }

    #[test]
    fn test_colorbar_size_and_transparency() {
        let config = ColorbarConfig {
            width: 400,
            height: 60,
            ..Default::default()
        };
        let image = render_colorbar(&scheme(), &config).unwrap();
        assert_eq!(image.dimensions(), (400, 60));
        // Bottom corners stay transparent
        assert_eq!(image.get_pixel(0, 59).0[3], 0);
        assert_eq!(image.get_pixel(399, 59).0[3], 0);
    }

    #[test]
    fn test_band_colors_in_order() {
        let scheme = scheme();
        let config = ColorbarConfig {
            width: 400,
            height: 60,
            ..Default::default()
        };
        let layout = Layout::new(&scheme, &config).unwrap();
        let image = render_colorbar(&scheme, &config).unwrap();
        let bands = scheme.levels().len() - 1;
        let y = layout.mid_y() as u32;
        for k in 0..bands {
            let x = ((layout.edge_x(k, bands) + layout.edge_x(k + 1, bands)) / 2.0) as u32;
            assert_eq!(image.get_pixel(x, y).0, scheme.colors()[k + 1].to_array(), "band {}", k);
        }
        // Extension triangles carry the open-band colors
        let left = (layout.bar_left - layout.triangle * 0.3) as u32;
        assert_eq!(image.get_pixel(left, y).0, scheme.below_color().to_array());
        let right = (layout.bar_right + layout.triangle * 0.3) as u32;
        assert_eq!(image.get_pixel(right, y).0, scheme.above_color().to_array());
    }

    #[test]
    fn test_too_small_is_error() {
        let config = ColorbarConfig {
            width: 20,
            height: 60,
            ..Default::default()
        };
        assert!(render_colorbar(&scheme(), &config).is_err());
    }
}
