//! Tests for PNG encoding.
//!
//! Encoded frames are decoded again with the `image` crate to check that
//! both the indexed and the RGBA paths are lossless.

use image::{Rgba, RgbaImage};
use renderer::png::{create_png, create_png_auto, create_png_indexed, encode_png, write_png};

// ============================================================================
// Helper functions
// ============================================================================

/// Temperature-like band colors
fn band_palette() -> [[u8; 4]; 8] {
    [
        [102, 0, 214, 255],
        [0, 51, 255, 255],
        [0, 191, 255, 255],
        [0, 255, 128, 255],
        [255, 255, 0, 255],
        [255, 128, 0, 255],
        [214, 0, 0, 255],
        [0, 0, 0, 0],
    ]
}

/// A banded frame with a transparent strip, like a fill layer on its own.
fn banded_frame(width: u32, height: u32) -> RgbaImage {
    let palette = band_palette();
    RgbaImage::from_fn(width, height, |x, y| {
        if x < 4 {
            return Rgba(palette[7]);
        }
        let band = ((x + y) as usize * 7 / (width + height) as usize).min(6);
        Rgba(palette[band])
    })
}

fn decode(bytes: &[u8]) -> RgbaImage {
    image::load_from_memory(bytes).unwrap().to_rgba8()
}

fn color_type(png: &[u8]) -> u8 {
    // IHDR data starts after signature (8), length (4) and type (4)
    png[8 + 8 + 9]
}

// ============================================================================
// Round trips through a real decoder
// ============================================================================

#[test]
fn test_indexed_frame_decodes_identically() {
    let frame = banded_frame(256, 128);
    let png = encode_png(&frame).unwrap();
    assert_eq!(&png[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
    assert_eq!(color_type(&png), 3);
    assert_eq!(decode(&png), frame);
}

#[test]
fn test_rgba_fallback_decodes_identically() {
    let frame = RgbaImage::from_fn(40, 20, |x, y| Rgba([(x * 6) as u8, (y * 12) as u8, (x + y) as u8, 200]));
    let png = encode_png(&frame).unwrap();
    assert_eq!(color_type(&png), 6);
    assert_eq!(decode(&png), frame);
}

#[test]
fn test_indexed_smaller_than_rgba() {
    let frame = banded_frame(512, 256);
    let indexed = create_png_auto(frame.as_raw(), 512, 256).unwrap();
    let rgba = create_png(frame.as_raw(), 512, 256).unwrap();
    assert!(indexed.len() < rgba.len());
}

#[test]
fn test_explicit_palette() {
    let palette = [(255, 0, 0, 255), (0, 0, 255, 128)];
    let indices = [0, 1, 1, 0];
    let png = create_png_indexed(2, 2, &palette, &indices).unwrap();
    let decoded = decode(&png);
    assert_eq!(decoded.get_pixel(0, 0).0, [255, 0, 0, 255]);
    assert_eq!(decoded.get_pixel(1, 0).0, [0, 0, 255, 128]);
}

#[test]
fn test_palette_size_limits() {
    assert!(create_png_indexed(1, 1, &[], &[0]).is_err());
    let big = vec![(0, 0, 0, 255); 257];
    assert!(create_png_indexed(1, 1, &big, &[0]).is_err());
}

#[test]
fn test_write_png_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("0000.png");
    let frame = banded_frame(64, 32);
    let written = write_png(&path, &frame).unwrap();
    assert_eq!(written, std::fs::metadata(&path).unwrap().len());
    assert_eq!(image::open(&path).unwrap().to_rgba8(), frame);
}
