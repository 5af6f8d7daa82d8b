//! Plate carrée covering the whole globe.
//!
//! This is the layout SOS expects for sphere textures: a 2:1 image whose
//! left and right edges are the antimeridian of `central_lon`.

use crate::{MapProjection, ProjectionError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equirectangular {
    width: u32,
    height: u32,
    /// Longitude at the horizontal center of the image
    central_lon: f64,
}

impl Equirectangular {
    /// Full globe, `central_lon ± 180` by `±90`.
    pub fn global(width: u32, height: u32, central_lon: f64) -> Result<Self, ProjectionError> {
        if width == 0 || height == 0 {
            return Err(ProjectionError::InvalidSize { width, height });
        }
        Ok(Self {
            width,
            height,
            central_lon,
        })
    }

    pub fn central_lon(&self) -> f64 {
        self.central_lon
    }

    /// Longitude of the left image edge.
    fn west_edge(&self) -> f64 {
        self.central_lon - 180.0
    }

    fn deg_per_px_x(&self) -> f64 {
        360.0 / self.width as f64
    }

    fn deg_per_px_y(&self) -> f64 {
        180.0 / self.height as f64
    }
}

impl MapProjection for Equirectangular {
    fn project(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        if !(-90.0..=90.0).contains(&lat) || !lon.is_finite() {
            return None;
        }
        let x = (lon - self.west_edge()).rem_euclid(360.0) / self.deg_per_px_x();
        let y = (90.0 - lat) / self.deg_per_px_y();
        Some((x, y))
    }

    fn unproject(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let (w, h) = (self.width as f64, self.height as f64);
        if !(0.0..=w).contains(&x) || !(0.0..=h).contains(&y) {
            return None;
        }
        let lon = self.west_edge() + x * self.deg_per_px_x();
        let lat = 90.0 - y * self.deg_per_px_y();
        Some((lon, lat))
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn wraps_horizontally(&self) -> bool {
        true
    }
}
