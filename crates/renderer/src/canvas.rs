//! Conversions between the tiny-skia raster and `image` buffers, and
//! straight-alpha compositing.
//!
//! Vector layers are stroked on a premultiplied [`Pixmap`]; everything that
//! leaves the renderer is a straight-alpha [`RgbaImage`].

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use tiny_skia::{ColorU8, Pixmap};

use crate::colormap::Color;
use crate::error::{RenderError, RenderResult};

/// Transparent canvas, or `InvalidSize` for an empty one.
pub fn new_pixmap(width: u32, height: u32) -> RenderResult<Pixmap> {
    Pixmap::new(width, height).ok_or(RenderError::InvalidSize { width, height })
}

/// Canvas filled with one color.
pub fn solid_image(width: u32, height: u32, color: Color) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(color.to_array()))
}

/// Demultiply a pixmap into an RGBA image.
pub fn pixmap_to_image(pixmap: &Pixmap) -> RgbaImage {
    let width = pixmap.width();
    let pixels = pixmap.pixels();
    RgbaImage::from_fn(width, pixmap.height(), |x, y| {
        let c = pixels[(y * width + x) as usize].demultiply();
        Rgba([c.red(), c.green(), c.blue(), c.alpha()])
    })
}

/// Premultiply an RGBA image into a pixmap for further drawing.
pub fn image_to_pixmap(image: &RgbaImage) -> RenderResult<Pixmap> {
    let mut pixmap = new_pixmap(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

/// Blend `src` over `dst` (source-over, straight alpha).
///
/// Both images are aligned at the top-left corner; pixels outside the
/// overlap are left alone.
pub fn composite_over(dst: &mut RgbaImage, src: &RgbaImage) {
    let width = dst.width().min(src.width());
    let height = dst.height().min(src.height());

    for y in 0..height {
        for x in 0..width {
            let s = src.get_pixel(x, y).0;
            if s[3] == 0 {
                continue;
            }
            let d = dst.get_pixel_mut(x, y);
            d.0 = blend_over(s, d.0);
        }
    }
}

#[inline]
fn blend_over(src: [u8; 4], dst: [u8; 4]) -> [u8; 4] {
    let src_a = src[3] as f32 / 255.0;
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        return [0, 0, 0, 0];
    }

    let channel = |s: u8, d: u8| {
        ((s as f32 * src_a + d as f32 * dst_a * (1.0 - src_a)) / out_a).round() as u8
    };
    [
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ]
}

/// Drop the alpha channel by compositing onto an opaque background.
pub fn flatten(image: &RgbaImage, background: Color) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, _] = blend_over(image.get_pixel(x, y).0, background.with_alpha(255).to_array());
        Rgb([r, g, b])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pixmap_rejects_empty() {
        assert!(matches!(
            new_pixmap(0, 10),
            Err(RenderError::InvalidSize { width: 0, height: 10 })
        ));
    }

    #[test]
    fn test_pixmap_image_roundtrip_opaque() {
        let mut image = solid_image(3, 2, Color::rgb(10, 200, 30));
        image.put_pixel(1, 1, Rgba([255, 0, 0, 255]));
        let back = pixmap_to_image(&image_to_pixmap(&image).unwrap());
        assert_eq!(back, image);
    }

    #[test]
    fn test_half_transparent_demultiplies() {
        let image = solid_image(1, 1, Color::new(200, 100, 0, 128));
        let back = pixmap_to_image(&image_to_pixmap(&image).unwrap());
        let [r, g, b, a] = back.get_pixel(0, 0).0;
        assert_eq!(a, 128);
        assert!((r as i32 - 200).abs() <= 2);
        assert!((g as i32 - 100).abs() <= 2);
        assert_eq!(b, 0);
    }

    #[test]
    fn test_composite_over() {
        let mut dst = solid_image(2, 1, Color::rgb(0, 0, 255));
        let mut src = RgbaImage::new(2, 1);
        src.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        src.put_pixel(1, 0, Rgba([255, 0, 0, 0]));
        composite_over(&mut dst, &src);
        assert_eq!(dst.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(dst.get_pixel(1, 0).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_composite_half_alpha_on_transparent() {
        let mut dst = RgbaImage::new(1, 1);
        let src = solid_image(1, 1, Color::new(100, 100, 100, 128));
        composite_over(&mut dst, &src);
        assert_eq!(dst.get_pixel(0, 0).0, [100, 100, 100, 128]);
    }

    #[test]
    fn test_flatten_onto_black() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, Rgba([200, 100, 50, 255]));
        let flat = flatten(&image, Color::BLACK);
        assert_eq!(flat.get_pixel(0, 0).0, [200, 100, 50]);
        assert_eq!(flat.get_pixel(1, 0).0, [0, 0, 0]);
    }
}
