//! Filled color bands, sampled per output pixel.

use image::RgbaImage;
use projection::MapProjection;
use rayon::prelude::*;
use sos_common::FieldSlice;

use crate::colormap::BandScheme;
use crate::error::{RenderError, RenderResult};

/// Color every pixel of the projection by the band its value falls in.
///
/// Each pixel center is unprojected, the field is sampled bilinearly and the
/// value is mapped through `scheme`. Off-globe pixels and missing values stay
/// transparent. Rows are rendered in parallel.
pub fn render_filled_bands<P: MapProjection + ?Sized>(
    slice: &FieldSlice,
    proj: &P,
    scheme: &BandScheme,
) -> RenderResult<RgbaImage> {
    let (width, height) = proj.size();
    let row_bytes = width as usize * 4;
    let mut pixels = vec![0u8; row_bytes * height as usize];

    pixels
        .par_chunks_mut(row_bytes)
        .enumerate()
        .for_each(|(y, row)| {
            let py = y as f64 + 0.5;
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let Some((lon, lat)) = proj.unproject(x as f64 + 0.5, py) else {
                    continue;
                };
                if let Some(color) = scheme.color_for(slice.sample(lon, lat)) {
                    px.copy_from_slice(&color.to_array());
                }
            }
        });

    let covered = pixels.chunks_exact(4).filter(|p| p[3] > 0).count();
    tracing::debug!(
        field = %slice.name,
        width = width,
        height = height,
        covered = covered,
        "Rendered filled bands"
    );

    RgbaImage::from_raw(width, height, pixels).ok_or(RenderError::InvalidSize { width, height })
}
