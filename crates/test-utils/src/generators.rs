//! Test data generators for synthetic global reanalysis-like fields.
//!
//! Grids are row-major with latitude descending from 90°N to 90°S and
//! longitude ascending from 0°E, matching the yearly reanalysis archives.

/// Longitudes `0, step, … , 360 - step`.
pub fn global_lon_axis(step: f64) -> Vec<f64> {
    let n = (360.0 / step).round() as usize;
    (0..n).map(|i| i as f64 * step).collect()
}

/// Latitudes `90, 90 - step, … , -90`.
pub fn global_lat_axis(step: f64) -> Vec<f64> {
    let n = (180.0 / step).round() as usize + 1;
    (0..n).map(|j| 90.0 - j as f64 * step).collect()
}

/// Axes of a regular global grid.
#[derive(Debug, Clone)]
pub struct GlobalGrid {
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
}

impl GlobalGrid {
    pub fn new(step: f64) -> Self {
        Self {
            lon: global_lon_axis(step),
            lat: global_lat_axis(step),
        }
    }

    /// The 2.5° grid of the NCEP/NCAR reanalysis (144 × 73).
    pub fn ncep_2p5() -> Self {
        Self::new(2.5)
    }

    pub fn width(&self) -> usize {
        self.lon.len()
    }

    pub fn height(&self) -> usize {
        self.lat.len()
    }

    fn fill(&self, f: impl Fn(f64, f64) -> f64) -> Vec<f32> {
        let mut data = Vec::with_capacity(self.width() * self.height());
        for &lat in &self.lat {
            for &lon in &self.lon {
                data.push(f(lon, lat) as f32);
            }
        }
        data
    }

    /// 500 hPa-like geopotential height in meters: a polar low with a
    /// wavenumber-4 trough pattern.
    pub fn height_field(&self) -> Vec<f32> {
        self.fill(|lon, lat| {
            let (lon_r, lat_r) = (lon.to_radians(), lat.to_radians());
            5850.0 - 500.0 * lat_r.sin().powi(2) + 80.0 * (4.0 * lon_r).cos() * (2.0 * lat_r).sin().abs()
        })
    }

    /// Temperature in Kelvin: warm tropics, cold poles.
    pub fn temperature_field(&self) -> Vec<f32> {
        self.fill(|lon, lat| {
            let (lon_r, lat_r) = (lon.to_radians(), lat.to_radians());
            262.0 - 30.0 * lat_r.sin().powi(2) + 3.0 * (4.0 * lon_r).cos() * lat_r.cos()
        })
    }

    /// Eastward wind in m/s: a jet near 40° in both hemispheres.
    pub fn u_wind_field(&self) -> Vec<f32> {
        self.fill(|_lon, lat| 35.0 * (-((lat.abs() - 40.0) / 12.0).powi(2)).exp())
    }

    /// Northward wind in m/s following the wavenumber-4 pattern.
    pub fn v_wind_field(&self) -> Vec<f32> {
        self.fill(|lon, lat| 12.0 * (4.0 * lon.to_radians()).sin() * lat.to_radians().cos())
    }
}

/// Creates a grid filled with a constant value.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Creates a grid with a single peak of `peak` at its center, falling off
/// linearly with distance. Useful for contour tests.
pub fn create_peak_grid(width: usize, height: usize, peak: f32) -> Vec<f32> {
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;
    let max_dist = (cx * cx + cy * cy).sqrt().max(1.0);
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let dx = col as f32 - cx;
            let dy = row as f32 - cy;
            let dist = (dx * dx + dy * dy).sqrt();
            data.push(peak * (1.0 - dist / max_dist));
        }
    }
    data
}
