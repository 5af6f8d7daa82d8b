//! Map projections for whole-globe frames and globe thumbnails.
//!
//! Every projection maps geographic coordinates (degrees east, degrees
//! north) to pixel coordinates of an output image, origin at the top left,
//! `x` to the right and `y` down.

pub mod equirectangular;
pub mod orthographic;

pub use equirectangular::Equirectangular;
pub use orthographic::Orthographic;

use thiserror::Error;

/// Step in degrees used for finite-difference screen axes.
const AXIS_STEP_DEG: f64 = 0.05;

#[derive(Debug, Error, PartialEq)]
pub enum ProjectionError {
    #[error("invalid image size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("central latitude {0} out of range")]
    InvalidCenter(f64),
}

/// A projection from the sphere onto an image.
pub trait MapProjection: Send + Sync {
    /// Geographic point to pixel coordinates, `None` when not visible.
    fn project(&self, lon: f64, lat: f64) -> Option<(f64, f64)>;

    /// Pixel coordinates to a geographic point, `None` off the globe.
    fn unproject(&self, x: f64, y: f64) -> Option<(f64, f64)>;

    /// Output image size in pixels.
    fn size(&self) -> (u32, u32);

    /// True when the left and right image edges are the same meridian, so a
    /// line may leave one side and come back on the other.
    fn wraps_horizontally(&self) -> bool {
        false
    }

    /// Whether the straight screen segment between two projected points
    /// would cut across the image instead of following the surface.
    fn is_seam_jump(&self, a: (f64, f64), b: (f64, f64)) -> bool {
        if !self.wraps_horizontally() {
            return false;
        }
        let (width, _) = self.size();
        (a.0 - b.0).abs() > width as f64 / 2.0
    }
}

impl<P: MapProjection + ?Sized> MapProjection for &P {
    fn project(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        (**self).project(lon, lat)
    }

    fn unproject(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        (**self).unproject(x, y)
    }

    fn size(&self) -> (u32, u32) {
        (**self).size()
    }

    fn wraps_horizontally(&self) -> bool {
        (**self).wraps_horizontally()
    }
}

/// Wrap a longitude into `[-180, 180)`.
pub fn normalize_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Screen-space unit vectors pointing east and north at a point.
///
/// Uses finite differences, so it works for any projection. Returns `None`
/// when the point is not visible or the axes degenerate (e.g. at a pole of
/// a cylindrical projection where east has no direction).
pub fn local_axes<P: MapProjection + ?Sized>(
    proj: &P,
    lon: f64,
    lat: f64,
) -> Option<((f64, f64), (f64, f64))> {
    let origin = proj.project(lon, lat)?;

    let east = one_sided_difference(
        proj,
        origin,
        proj.project(lon + AXIS_STEP_DEG, lat),
        proj.project(lon - AXIS_STEP_DEG, lat),
    )?;

    let north = if lat + AXIS_STEP_DEG <= 90.0 {
        one_sided_difference(
            proj,
            origin,
            proj.project(lon, lat + AXIS_STEP_DEG),
            proj.project(lon, lat - AXIS_STEP_DEG),
        )?
    } else {
        let below = proj.project(lon, lat - AXIS_STEP_DEG)?;
        unit((origin.0 - below.0, origin.1 - below.1))?
    };

    Some((east, north))
}

/// Direction from `origin` toward `ahead`, or from `behind` toward `origin`
/// when the forward point is hidden or across a seam.
fn one_sided_difference<P: MapProjection + ?Sized>(
    proj: &P,
    origin: (f64, f64),
    ahead: Option<(f64, f64)>,
    behind: Option<(f64, f64)>,
) -> Option<(f64, f64)> {
    if let Some(a) = ahead.filter(|&a| !proj.is_seam_jump(origin, a)) {
        if let Some(v) = unit((a.0 - origin.0, a.1 - origin.1)) {
            return Some(v);
        }
    }
    let b = behind.filter(|&b| !proj.is_seam_jump(b, origin))?;
    unit((origin.0 - b.0, origin.1 - b.1))
}

fn unit(v: (f64, f64)) -> Option<(f64, f64)> {
    let len = (v.0 * v.0 + v.1 * v.1).sqrt();
    if len < 1e-12 {
        None
    } else {
        Some((v.0 / len, v.1 / len))
    }
}
