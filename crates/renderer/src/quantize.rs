//! Palette quantization for frame PNGs.
//!
//! Frames with few colors get an exact palette. Anti-aliased strokes over the
//! color bands can push a frame past 256 colors, in which case a median-cut
//! palette is built from the color histogram and every pixel is mapped to its
//! nearest entry.

use std::collections::HashMap;
use std::path::Path;

use rayon::prelude::*;
use tracing::debug;

use crate::error::{RenderError, RenderResult};
use crate::png::{create_png_indexed, extract_palette, pack_color, unpack_color, PaletteEntry, MAX_PALETTE_SIZE};

/// Palette and per-pixel indices of a quantized image.
#[derive(Debug, Clone)]
pub struct Quantized {
    pub palette: Vec<PaletteEntry>,
    pub indices: Vec<u8>,
}

/// Result of [`shrink_png_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShrinkStats {
    /// Size of the file before, in bytes
    pub before: u64,
    /// Size of the file after, in bytes
    pub after: u64,
    /// Palette size of the indexed encoding
    pub colors: usize,
    /// The indexed file was not smaller and the original was kept
    pub kept_original: bool,
}

/// A histogram entry: packed color and pixel count.
#[derive(Debug, Clone, Copy)]
struct Bin {
    color: u32,
    count: u32,
}

#[inline]
fn channel(color: u32, c: usize) -> u8 {
    (color >> (8 * c)) as u8
}

/// A box of histogram bins in RGBA space.
#[derive(Debug)]
struct ColorBox {
    bins: Vec<Bin>,
}

impl ColorBox {
    fn weight(&self) -> u64 {
        self.bins.iter().map(|b| b.count as u64).sum()
    }

    /// Channel with the widest spread and that spread.
    fn widest_channel(&self) -> (usize, u8) {
        (0..4)
            .map(|c| {
                let (lo, hi) = self.bins.iter().fold((u8::MAX, u8::MIN), |(lo, hi), b| {
                    let v = channel(b.color, c);
                    (lo.min(v), hi.max(v))
                });
                (c, hi.saturating_sub(lo))
            })
            .max_by_key(|&(_, range)| range)
            .unwrap_or((0, 0))
    }

    /// Split at the weighted median of the widest channel.
    fn split(mut self) -> (ColorBox, ColorBox) {
        let (c, _) = self.widest_channel();
        self.bins.sort_unstable_by_key(|b| channel(b.color, c));

        let half = self.weight() / 2;
        let mut acc = 0u64;
        let mut at = 1;
        for (i, bin) in self.bins.iter().enumerate() {
            acc += bin.count as u64;
            if acc >= half {
                at = i + 1;
                break;
            }
        }
        let at = at.clamp(1, self.bins.len() - 1);
        let upper = self.bins.split_off(at);
        (self, ColorBox { bins: upper })
    }

    /// Count-weighted mean color.
    fn average(&self) -> PaletteEntry {
        let weight = self.weight().max(1);
        let mut sums = [0u64; 4];
        for bin in &self.bins {
            for (c, sum) in sums.iter_mut().enumerate() {
                *sum += channel(bin.color, c) as u64 * bin.count as u64;
            }
        }
        let mean = |s: u64| ((s + weight / 2) / weight) as u8;
        (mean(sums[0]), mean(sums[1]), mean(sums[2]), mean(sums[3]))
    }
}

/// Fully transparent pixels all collapse to one color.
#[inline]
fn normalized(px: &[u8]) -> u32 {
    if px[3] == 0 {
        0
    } else {
        pack_color(px[0], px[1], px[2], px[3])
    }
}

fn histogram(pixels: &[u8]) -> HashMap<u32, u32> {
    pixels
        .par_chunks(4 * 4096)
        .fold(HashMap::new, |mut map: HashMap<u32, u32>, chunk| {
            for px in chunk.chunks_exact(4) {
                *map.entry(normalized(px)).or_insert(0) += 1;
            }
            map
        })
        .reduce(HashMap::new, |mut a, b| {
            for (color, count) in b {
                *a.entry(color).or_insert(0) += count;
            }
            a
        })
}

fn median_cut(bins: Vec<Bin>, target: usize) -> Vec<PaletteEntry> {
    if bins.is_empty() || target == 0 {
        return Vec::new();
    }
    let mut boxes = vec![ColorBox { bins }];
    while boxes.len() < target {
        // Split the heaviest box that still has a spread
        let candidate = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.bins.len() > 1 && b.widest_channel().1 > 0)
            .max_by_key(|(_, b)| b.weight() * b.widest_channel().1 as u64)
            .map(|(i, _)| i);
        let Some(index) = candidate else { break };
        let (lower, upper) = boxes.swap_remove(index).split();
        boxes.push(lower);
        boxes.push(upper);
    }
    boxes.iter().map(ColorBox::average).collect()
}

fn nearest(palette: &[PaletteEntry], color: u32) -> u8 {
    let (r, g, b, a) = unpack_color(color);
    let dist = |&(pr, pg, pb, pa): &PaletteEntry| {
        let d = |x: u8, y: u8| (x as i32 - y as i32).pow(2);
        d(r, pr) + d(g, pg) + d(b, pb) + d(a, pa)
    };
    palette
        .iter()
        .enumerate()
        .min_by_key(|(_, entry)| dist(entry))
        .map(|(i, _)| i as u8)
        .unwrap_or(0)
}

/// Reduce RGBA `pixels` to a palette of at most `max_colors` entries.
pub fn quantize(pixels: &[u8], max_colors: usize) -> RenderResult<Quantized> {
    if !(2..=MAX_PALETTE_SIZE).contains(&max_colors) {
        return Err(RenderError::Encode(format!(
            "max_colors must be in 2..={}, got {}",
            MAX_PALETTE_SIZE, max_colors
        )));
    }
    if pixels.len() % 4 != 0 {
        return Err(RenderError::Encode(format!(
            "RGBA buffer length {} is not a multiple of 4",
            pixels.len()
        )));
    }

    if let Some((palette, indices)) = extract_palette(pixels, max_colors) {
        return Ok(Quantized { palette, indices });
    }

    let hist = histogram(pixels);
    let unique = hist.len();

    // Transparent pixels keep an exact entry of their own
    let has_transparent = hist.contains_key(&0);
    let bins: Vec<Bin> = hist
        .into_iter()
        .filter(|&(color, _)| color != 0)
        .map(|(color, count)| Bin { color, count })
        .collect();
    let target = max_colors - has_transparent as usize;
    let mut palette = median_cut(bins, target);
    if has_transparent {
        palette.push((0, 0, 0, 0));
    }

    let mut colors: Vec<u32> = pixels.par_chunks_exact(4).map(normalized).collect();
    colors.par_sort_unstable();
    colors.dedup();
    let lookup: HashMap<u32, u8> = colors
        .into_par_iter()
        .map(|color| {
            let index = if color == 0 && has_transparent {
                (palette.len() - 1) as u8
            } else {
                nearest(&palette, color)
            };
            (color, index)
        })
        .collect();

    let indices: Vec<u8> = pixels
        .par_chunks_exact(4)
        .map(|px| lookup.get(&normalized(px)).copied().unwrap_or(0))
        .collect();

    debug!(unique_colors = unique, palette = palette.len(), "Median-cut quantization");
    Ok(Quantized { palette, indices })
}

/// Rewrite the PNG at `path` as an indexed PNG of at most `max_colors` colors.
///
/// The original is kept when the indexed encoding is not smaller.
pub fn shrink_png_file(path: &Path, max_colors: usize) -> RenderResult<ShrinkStats> {
    let original = std::fs::read(path)?;
    let image = image::load_from_memory(&original)?.to_rgba8();
    let quantized = quantize(image.as_raw(), max_colors)?;
    let encoded = create_png_indexed(
        image.width() as usize,
        image.height() as usize,
        &quantized.palette,
        &quantized.indices,
    )?;

    let before = original.len() as u64;
    let kept_original = encoded.len() as u64 >= before;
    if !kept_original {
        std::fs::write(path, &encoded)?;
    }
    let stats = ShrinkStats {
        before,
        after: if kept_original { before } else { encoded.len() as u64 },
        colors: quantized.palette.len(),
        kept_original,
    };
    debug!(
        path = %path.display(),
        before = stats.before,
        after = stats.after,
        colors = stats.colors,
        "Shrunk PNG"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Vec<u8> {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[(x * 255 / width) as u8, (y * 255 / height) as u8, 128, 255]);
            }
        }
        pixels
    }

    #[test]
    fn test_exact_palette_when_colors_fit() {
        let pixels = [10, 20, 30, 255, 40, 50, 60, 255, 10, 20, 30, 255];
        let q = quantize(&pixels, 4).unwrap();
        assert_eq!(q.palette.len(), 2);
        assert_eq!(q.indices, vec![0, 1, 0]);
    }

    #[test]
    fn test_median_cut_limits_palette() {
        let pixels = gradient(64, 64);
        let q = quantize(&pixels, 16).unwrap();
        assert!(q.palette.len() <= 16);
        assert!(q.palette.len() >= 8);
        assert_eq!(q.indices.len(), 64 * 64);
        assert!(q.indices.iter().all(|&i| (i as usize) < q.palette.len()));
    }

    #[test]
    fn test_nearest_entry_is_close() {
        let pixels = gradient(64, 64);
        let q = quantize(&pixels, 64).unwrap();
        for (px, &i) in pixels.chunks_exact(4).zip(&q.indices) {
            let (r, g, _, _) = q.palette[i as usize];
            assert!((r as i32 - px[0] as i32).abs() <= 40);
            assert!((g as i32 - px[1] as i32).abs() <= 40);
        }
    }

    #[test]
    fn test_transparent_pixels_stay_transparent() {
        let mut pixels = gradient(32, 32);
        for px in pixels.chunks_exact_mut(4).step_by(3) {
            px.copy_from_slice(&[90, 90, 90, 0]);
        }
        let q = quantize(&pixels, 8).unwrap();
        for (px, &i) in pixels.chunks_exact(4).zip(&q.indices) {
            let alpha = q.palette[i as usize].3;
            if px[3] == 0 {
                assert_eq!(alpha, 0);
            } else {
                assert_eq!(alpha, 255);
            }
        }
    }

    #[test]
    fn test_invalid_color_count() {
        assert!(quantize(&[0, 0, 0, 255], 1).is_err());
        assert!(quantize(&[0, 0, 0, 255], 257).is_err());
    }
}
