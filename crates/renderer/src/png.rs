//! PNG encoding for rendered frames.
//!
//! Two encodings are produced:
//! - **Indexed PNG (color type 3)** when the frame has at most 256 distinct
//!   colors. Banded fills with basemap and barb strokes usually do.
//! - **RGBA PNG (color type 6)** otherwise. [`crate::quantize`] can reduce
//!   such frames to a palette afterwards.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use image::RgbaImage;
use rayon::prelude::*;

use crate::error::{RenderError, RenderResult};

/// Maximum colors for indexed PNG (PNG8)
pub const MAX_PALETTE_SIZE: usize = 256;

/// Minimum pixels to benefit from parallel palette extraction
const PARALLEL_THRESHOLD: usize = 4096;

const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// RGBA palette entry.
pub type PaletteEntry = (u8, u8, u8, u8);

/// Encode an image, choosing indexed output when the colors fit.
pub fn encode_png(image: &RgbaImage) -> RenderResult<Vec<u8>> {
    create_png_auto(image.as_raw(), image.width() as usize, image.height() as usize)
}

/// Encode `image` and write it to `path`.
pub fn write_png(path: &Path, image: &RgbaImage) -> RenderResult<u64> {
    let bytes = encode_png(image)?;
    std::fs::write(path, &bytes)?;
    Ok(bytes.len() as u64)
}

/// Create a PNG from raw RGBA bytes with automatic format selection.
pub fn create_png_auto(pixels: &[u8], width: usize, height: usize) -> RenderResult<Vec<u8>> {
    check_len(pixels.len(), width, height, 4)?;
    match extract_palette(pixels, MAX_PALETTE_SIZE) {
        Some((palette, indices)) => create_png_indexed(width, height, &palette, &indices),
        None => create_png(pixels, width, height),
    }
}

/// Exact palette of `pixels` if it has at most `max_colors` distinct colors.
pub(crate) fn extract_palette(pixels: &[u8], max_colors: usize) -> Option<(Vec<PaletteEntry>, Vec<u8>)> {
    let max_colors = max_colors.min(MAX_PALETTE_SIZE);
    if pixels.len() / 4 >= PARALLEL_THRESHOLD {
        extract_palette_parallel(pixels, max_colors)
    } else {
        extract_palette_sequential(pixels, max_colors)
    }
}

/// Pack RGBA bytes into a u32 for faster hashing and comparison
#[inline(always)]
pub(crate) fn pack_color(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (r as u32) | ((g as u32) << 8) | ((b as u32) << 16) | ((a as u32) << 24)
}

#[inline(always)]
pub(crate) fn unpack_color(packed: u32) -> PaletteEntry {
    (
        packed as u8,
        (packed >> 8) as u8,
        (packed >> 16) as u8,
        (packed >> 24) as u8,
    )
}

fn extract_palette_sequential(pixels: &[u8], max_colors: usize) -> Option<(Vec<PaletteEntry>, Vec<u8>)> {
    let mut color_to_index: HashMap<u32, u8> = HashMap::with_capacity(max_colors);
    let mut palette: Vec<PaletteEntry> = Vec::with_capacity(max_colors);
    let mut indices: Vec<u8> = Vec::with_capacity(pixels.len() / 4);

    for chunk in pixels.chunks_exact(4) {
        let packed = pack_color(chunk[0], chunk[1], chunk[2], chunk[3]);
        let index = match color_to_index.get(&packed) {
            Some(&idx) => idx,
            None => {
                if palette.len() >= max_colors {
                    return None;
                }
                let idx = palette.len() as u8;
                palette.push((chunk[0], chunk[1], chunk[2], chunk[3]));
                color_to_index.insert(packed, idx);
                idx
            }
        };
        indices.push(index);
    }

    Some((palette, indices))
}

/// Parallel palette extraction for full-size frames.
///
/// Each chunk collects its distinct colors, the sets are merged, and a
/// second parallel pass maps pixels to palette indices.
fn extract_palette_parallel(pixels: &[u8], max_colors: usize) -> Option<(Vec<PaletteEntry>, Vec<u8>)> {
    let chunk_pixels = (pixels.len() / 4 / rayon::current_num_threads()).max(256);
    let chunk_size = chunk_pixels * 4;

    let unique_colors: Vec<u32> = pixels
        .par_chunks(chunk_size)
        .flat_map(|chunk| {
            let mut local: HashMap<u32, ()> = HashMap::with_capacity(max_colors);
            for pixel in chunk.chunks_exact(4) {
                local.insert(pack_color(pixel[0], pixel[1], pixel[2], pixel[3]), ());
                // Already too many for a palette
                if local.len() > max_colors {
                    break;
                }
            }
            local.into_keys().collect::<Vec<_>>()
        })
        .collect();

    let mut global: HashMap<u32, u8> = HashMap::with_capacity(max_colors);
    let mut palette: Vec<PaletteEntry> = Vec::with_capacity(max_colors);
    for packed in unique_colors {
        if !global.contains_key(&packed) {
            if palette.len() >= max_colors {
                return None;
            }
            global.insert(packed, palette.len() as u8);
            palette.push(unpack_color(packed));
        }
    }

    let mut indices = vec![0u8; pixels.len() / 4];
    indices
        .par_chunks_mut(chunk_pixels)
        .zip(pixels.par_chunks(chunk_size))
        .for_each(|(idx_chunk, px_chunk)| {
            for (idx, px) in idx_chunk.iter_mut().zip(px_chunk.chunks_exact(4)) {
                *idx = global
                    .get(&pack_color(px[0], px[1], px[2], px[3]))
                    .copied()
                    .unwrap_or(0);
            }
        });

    Some((palette, indices))
}

/// Create an indexed PNG (color type 3) from palette and indices.
pub fn create_png_indexed(
    width: usize,
    height: usize,
    palette: &[PaletteEntry],
    indices: &[u8],
) -> RenderResult<Vec<u8>> {
    check_len(indices.len(), width, height, 1)?;
    if palette.is_empty() || palette.len() > MAX_PALETTE_SIZE {
        return Err(RenderError::Encode(format!(
            "palette has {} entries; expected 1..={}",
            palette.len(),
            MAX_PALETTE_SIZE
        )));
    }

    let mut png = Vec::new();
    png.extend_from_slice(&SIGNATURE);
    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 3));

    let plte: Vec<u8> = palette.iter().flat_map(|&(r, g, b, _)| [r, g, b]).collect();
    write_chunk(&mut png, b"PLTE", &plte);

    // tRNS only when some entry is not opaque
    if palette.iter().any(|&(_, _, _, a)| a < 255) {
        let trns: Vec<u8> = palette.iter().map(|&(_, _, _, a)| a).collect();
        write_chunk(&mut png, b"tRNS", &trns);
    }

    let idat = deflate_scanlines(indices, width, height)?;
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// Create an RGBA PNG (color type 6).
pub fn create_png(pixels: &[u8], width: usize, height: usize) -> RenderResult<Vec<u8>> {
    check_len(pixels.len(), width, height, 4)?;

    let mut png = Vec::new();
    png.extend_from_slice(&SIGNATURE);
    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 6));
    let idat = deflate_scanlines(pixels, width * 4, height)?;
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

fn check_len(len: usize, width: usize, height: usize, bytes_per_pixel: usize) -> RenderResult<()> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidSize {
            width: width as u32,
            height: height as u32,
        });
    }
    if len != width * height * bytes_per_pixel {
        return Err(RenderError::Encode(format!(
            "buffer has {} bytes, expected {} for {}x{}",
            len,
            width * height * bytes_per_pixel,
            width,
            height
        )));
    }
    Ok(())
}

fn ihdr(width: usize, height: usize, color_type: u8) -> Vec<u8> {
    let mut data = Vec::with_capacity(13);
    data.extend_from_slice(&(width as u32).to_be_bytes());
    data.extend_from_slice(&(height as u32).to_be_bytes());
    data.push(8); // bit depth
    data.push(color_type);
    data.push(0); // compression
    data.push(0); // filter
    data.push(0); // interlace
    data
}

fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Prefix each scanline with filter type 0 and zlib-compress.
fn deflate_scanlines(data: &[u8], row_bytes: usize, height: usize) -> RenderResult<Vec<u8>> {
    let mut uncompressed = Vec::with_capacity(height * (1 + row_bytes));
    for row in data.chunks_exact(row_bytes) {
        uncompressed.push(0);
        uncompressed.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder
        .write_all(&uncompressed)
        .map_err(|e| RenderError::Encode(format!("IDAT compression failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| RenderError::Encode(format!("IDAT compression failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_palette_simple() {
        let pixels = [
            255, 0, 0, 255, // red
            0, 255, 0, 255, // green
            0, 0, 255, 255, // blue
            255, 0, 0, 255, // red again
        ];

        let (palette, indices) = extract_palette(&pixels, 256).unwrap();
        assert_eq!(palette.len(), 3);
        assert_eq!(indices, vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_extract_palette_respects_limit() {
        let pixels = [255, 0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 255];
        assert!(extract_palette(&pixels, 2).is_none());
        assert!(extract_palette(&pixels, 3).is_some());
    }

    #[test]
    fn test_parallel_matches_sequential_indices() {
        // 128x128 is above the parallel threshold
        let mut pixels = Vec::with_capacity(128 * 128 * 4);
        for y in 0..128u32 {
            for x in 0..128u32 {
                let c = ((x / 8 + y / 8) % 50) as u8;
                pixels.extend_from_slice(&[c * 5, 100 + c * 3, 200 - c * 2, 255]);
            }
        }

        let (palette, indices) = extract_palette(&pixels, 256).unwrap();
        assert_eq!(palette.len(), 50);
        assert_eq!(indices.len(), 128 * 128);
        for (i, px) in pixels.chunks_exact(4).enumerate() {
            let (r, g, b, a) = palette[indices[i] as usize];
            assert_eq!([r, g, b, a], [px[0], px[1], px[2], px[3]]);
        }
    }

    #[test]
    fn test_transparency_chunk_only_when_needed() {
        let opaque = create_png_indexed(1, 1, &[(1, 2, 3, 255)], &[0]).unwrap();
        assert!(!opaque.windows(4).any(|w| w == b"tRNS"));

        let clear = create_png_indexed(1, 1, &[(0, 0, 0, 0)], &[0]).unwrap();
        assert!(clear.windows(4).any(|w| w == b"tRNS"));
    }

    #[test]
    fn test_buffer_size_mismatch() {
        assert!(matches!(create_png(&[0; 12], 2, 2), Err(RenderError::Encode(_))));
        assert!(matches!(create_png(&[], 0, 2), Err(RenderError::InvalidSize { .. })));
    }
}
