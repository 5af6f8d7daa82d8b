//! Orthographic view of one hemisphere, as seen from far away.
//!
//! Used for the playlist thumbnails. The globe fills a square image; the
//! corners outside the disc are empty.

use crate::{normalize_lon, MapProjection, ProjectionError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orthographic {
    size: u32,
    central_lon: f64,
    central_lat: f64,
    sin_lat0: f64,
    cos_lat0: f64,
}

impl Orthographic {
    pub fn new(size: u32, central_lon: f64, central_lat: f64) -> Result<Self, ProjectionError> {
        if size == 0 {
            return Err(ProjectionError::InvalidSize {
                width: size,
                height: size,
            });
        }
        if !(-90.0..=90.0).contains(&central_lat) {
            return Err(ProjectionError::InvalidCenter(central_lat));
        }
        let lat0 = central_lat.to_radians();
        Ok(Self {
            size,
            central_lon,
            central_lat,
            sin_lat0: lat0.sin(),
            cos_lat0: lat0.cos(),
        })
    }

    pub fn center(&self) -> (f64, f64) {
        (self.central_lon, self.central_lat)
    }

    fn radius(&self) -> f64 {
        self.size as f64 / 2.0
    }
}

impl MapProjection for Orthographic {
    fn project(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        if !(-90.0..=90.0).contains(&lat) {
            return None;
        }
        let phi = lat.to_radians();
        let dlambda = (lon - self.central_lon).to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();

        // Cosine of the angular distance from the view center
        let cos_c = self.sin_lat0 * sin_phi + self.cos_lat0 * cos_phi * dlambda.cos();
        if cos_c < 0.0 {
            return None;
        }

        let x = cos_phi * dlambda.sin();
        let y = self.cos_lat0 * sin_phi - self.sin_lat0 * cos_phi * dlambda.cos();
        let r = self.radius();
        Some((r + r * x, r - r * y))
    }

    fn unproject(&self, px: f64, py: f64) -> Option<(f64, f64)> {
        let r = self.radius();
        let x = (px - r) / r;
        let y = (r - py) / r;
        let rho = (x * x + y * y).sqrt();
        if rho > 1.0 {
            return None;
        }
        if rho < 1e-12 {
            return Some((normalize_lon(self.central_lon), self.central_lat));
        }

        let c = rho.asin();
        let (sin_c, cos_c) = c.sin_cos();
        let lat = (cos_c * self.sin_lat0 + y * sin_c * self.cos_lat0 / rho)
            .clamp(-1.0, 1.0)
            .asin();
        let lon = self.central_lon.to_radians()
            + (x * sin_c).atan2(rho * cos_c * self.cos_lat0 - y * sin_c * self.sin_lat0);

        Some((normalize_lon(lon.to_degrees()), lat.to_degrees()))
    }

    fn size(&self) -> (u32, u32) {
        (self.size, self.size)
    }
}
