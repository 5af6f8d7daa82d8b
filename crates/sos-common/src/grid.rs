//! Gridded fields on a regular latitude/longitude axis.
//!
//! A [`GriddedField`] holds one physical variable at one pressure level for
//! a list of times, stored row-major as `[time][lat][lon]`. A [`FieldSlice`]
//! is a single timestep, which is what the renderers consume.

use chrono::{DateTime, Utc};

use crate::error::{FieldError, FieldResult};
use crate::units::{converter, Unit};

/// Tolerance used when comparing coordinate axes.
const COORD_EPSILON: f64 = 1e-6;

/// Tolerance used when checking that a longitude axis spans 360°.
const GLOBAL_EPSILON: f64 = 1e-3;

/// One variable at one level: `times × lat × lon`.
#[derive(Debug, Clone)]
pub struct GriddedField {
    /// Variable name as stored in the archive (e.g. `hgt`)
    pub name: String,
    pub unit: Unit,
    /// Pressure level in hPa
    pub level_hpa: f32,
    /// Longitudes in degrees east, ascending
    pub lon: Vec<f64>,
    /// Latitudes in degrees north, ascending or descending
    pub lat: Vec<f64>,
    pub times: Vec<DateTime<Utc>>,
    /// Values, `NaN` where missing
    pub data: Vec<f32>,
}

impl GriddedField {
    pub fn new(
        name: impl Into<String>,
        unit: Unit,
        level_hpa: f32,
        lon: Vec<f64>,
        lat: Vec<f64>,
        times: Vec<DateTime<Utc>>,
        data: Vec<f32>,
    ) -> FieldResult<Self> {
        let expected = times.len() * lat.len() * lon.len();
        if data.len() != expected {
            return Err(FieldError::ShapeMismatch {
                actual: data.len(),
                times: times.len(),
                lat: lat.len(),
                lon: lon.len(),
            });
        }
        Ok(Self {
            name: name.into(),
            unit,
            level_hpa,
            lon,
            lat,
            times,
            data,
        })
    }

    pub fn nlon(&self) -> usize {
        self.lon.len()
    }

    pub fn nlat(&self) -> usize {
        self.lat.len()
    }

    pub fn ntimes(&self) -> usize {
        self.times.len()
    }

    /// Extract one timestep.
    pub fn slice(&self, t: usize) -> FieldResult<FieldSlice> {
        if t >= self.ntimes() {
            return Err(FieldError::TimeOutOfRange {
                index: t,
                len: self.ntimes(),
            });
        }
        let plane = self.nlat() * self.nlon();
        Ok(FieldSlice {
            name: self.name.clone(),
            unit: self.unit,
            time: self.times[t],
            lon: self.lon.clone(),
            lat: self.lat.clone(),
            data: self.data[t * plane..(t + 1) * plane].to_vec(),
        })
    }

    /// Convert every value to `unit` and retag the field.
    pub fn convert_to(&mut self, unit: Unit) -> FieldResult<()> {
        let f = converter(self.unit, unit)?;
        for v in &mut self.data {
            *v = f(*v);
        }
        tracing::debug!(field = %self.name, from = %self.unit, to = %unit, "Converted units");
        self.unit = unit;
        Ok(())
    }

    pub fn is_cyclic(&self) -> bool {
        axis_is_cyclic(&self.lon)
    }

    /// Copy of this field with the first longitude column repeated at +360°.
    pub fn with_cyclic_point(&self) -> FieldResult<GriddedField> {
        if self.is_cyclic() {
            return Err(FieldError::AlreadyCyclic(self.name.clone()));
        }
        check_global(&self.lon)?;

        let nlon = self.nlon();
        let rows = self.ntimes() * self.nlat();
        let data = append_first_column(&self.data, rows, nlon);
        let mut lon = self.lon.clone();
        lon.push(self.lon[0] + 360.0);

        Ok(GriddedField {
            name: self.name.clone(),
            unit: self.unit,
            level_hpa: self.level_hpa,
            lon,
            lat: self.lat.clone(),
            times: self.times.clone(),
            data,
        })
    }

    /// Minimum and maximum of the non-missing values.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        value_range(&self.data)
    }
}

/// A single timestep of a gridded field, `lat × lon`, row-major.
#[derive(Debug, Clone)]
pub struct FieldSlice {
    pub name: String,
    pub unit: Unit,
    pub time: DateTime<Utc>,
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
    pub data: Vec<f32>,
}

impl FieldSlice {
    /// Build a slice directly from axes and values.
    pub fn from_parts(
        name: impl Into<String>,
        unit: Unit,
        time: DateTime<Utc>,
        lon: Vec<f64>,
        lat: Vec<f64>,
        data: Vec<f32>,
    ) -> FieldResult<Self> {
        if data.len() != lon.len() * lat.len() {
            return Err(FieldError::ShapeMismatch {
                actual: data.len(),
                times: 1,
                lat: lat.len(),
                lon: lon.len(),
            });
        }
        Ok(Self {
            name: name.into(),
            unit,
            time,
            lon,
            lat,
            data,
        })
    }

    /// Number of longitude columns.
    pub fn width(&self) -> usize {
        self.lon.len()
    }

    /// Number of latitude rows.
    pub fn height(&self) -> usize {
        self.lat.len()
    }

    #[inline]
    pub fn value(&self, i: usize, j: usize) -> f32 {
        self.data[j * self.width() + i]
    }

    pub fn is_cyclic(&self) -> bool {
        axis_is_cyclic(&self.lon)
    }

    /// Append the first longitude column at +360° so the globe closes.
    pub fn with_cyclic_point(self) -> FieldResult<FieldSlice> {
        if self.is_cyclic() {
            return Err(FieldError::AlreadyCyclic(self.name));
        }
        check_global(&self.lon)?;

        let data = append_first_column(&self.data, self.height(), self.width());
        let mut lon = self.lon;
        lon.push(lon[0] + 360.0);

        Ok(FieldSlice {
            lon,
            data,
            ..self
        })
    }

    /// Map fractional grid indices `(fx, fy)` to `(lon, lat)`.
    pub fn grid_to_geo(&self, fx: f64, fy: f64) -> (f64, f64) {
        (interp_axis(&self.lon, fx), interp_axis(&self.lat, fy))
    }

    /// Fractional column index for a longitude, wrapped into the axis range.
    /// `None` when the longitude falls in the gap past the last column.
    fn lon_index(&self, lon: f64) -> Option<f64> {
        let n = self.width();
        if n < 2 {
            return None;
        }
        let lon0 = self.lon[0];
        let dlon = (self.lon[n - 1] - lon0) / (n - 1) as f64;
        if dlon <= 0.0 {
            return None;
        }
        let wrapped = lon0 + (lon - lon0).rem_euclid(360.0);
        let mut fx = (wrapped - lon0) / dlon;
        // A point a hair below the seam may wrap to the far end of the axis
        if fx > (n - 1) as f64 && (360.0 - (wrapped - lon0)) / dlon < 1e-9 {
            fx = 0.0;
        }
        if fx > (n - 1) as f64 + 1e-9 {
            return None;
        }
        Some(fx.min((n - 1) as f64))
    }

    fn lat_index(&self, lat: f64) -> Option<f64> {
        let n = self.height();
        if n < 2 {
            return None;
        }
        let lat0 = self.lat[0];
        let dlat = (self.lat[n - 1] - lat0) / (n - 1) as f64;
        if dlat == 0.0 {
            return None;
        }
        let fy = (lat - lat0) / dlat;
        if fy < -1e-9 || fy > (n - 1) as f64 + 1e-9 {
            return None;
        }
        Some(fy.clamp(0.0, (n - 1) as f64))
    }

    /// Bilinear sample at a geographic point. `NaN` outside the grid or
    /// next to a missing value.
    pub fn sample(&self, lon: f64, lat: f64) -> f32 {
        let (Some(fx), Some(fy)) = (self.lon_index(lon), self.lat_index(lat)) else {
            return f32::NAN;
        };

        let x0 = fx.floor() as usize;
        let y0 = fy.floor() as usize;
        let x1 = (x0 + 1).min(self.width() - 1);
        let y1 = (y0 + 1).min(self.height() - 1);
        let dx = (fx - x0 as f64) as f32;
        let dy = (fy - y0 as f64) as f32;

        let v00 = self.value(x0, y0);
        let v10 = self.value(x1, y0);
        let v01 = self.value(x0, y1);
        let v11 = self.value(x1, y1);

        let top = v00 * (1.0 - dx) + v10 * dx;
        let bottom = v01 * (1.0 - dx) + v11 * dx;
        top * (1.0 - dy) + bottom * dy
    }

    pub fn value_range(&self) -> Option<(f32, f32)> {
        value_range(&self.data)
    }
}

/// The four variables a frame is drawn from. All share one coordinate set.
#[derive(Debug, Clone)]
pub struct FieldSet {
    pub height: GriddedField,
    pub temperature: GriddedField,
    pub u_wind: GriddedField,
    pub v_wind: GriddedField,
}

impl FieldSet {
    pub fn new(
        height: GriddedField,
        temperature: GriddedField,
        u_wind: GriddedField,
        v_wind: GriddedField,
    ) -> FieldResult<Self> {
        for other in [&temperature, &u_wind, &v_wind] {
            check_same_coordinates(&height, other)?;
        }
        Ok(Self {
            height,
            temperature,
            u_wind,
            v_wind,
        })
    }

    pub fn times(&self) -> &[DateTime<Utc>] {
        &self.height.times
    }

    /// All four slices for timestep `t`.
    pub fn frame(&self, t: usize) -> FieldResult<FrameFields> {
        Ok(FrameFields {
            time: self.height.times.get(t).copied().ok_or(FieldError::TimeOutOfRange {
                index: t,
                len: self.height.ntimes(),
            })?,
            height: self.height.slice(t)?,
            temperature: self.temperature.slice(t)?,
            u_wind: self.u_wind.slice(t)?,
            v_wind: self.v_wind.slice(t)?,
        })
    }
}

/// One timestep of every variable in a [`FieldSet`].
#[derive(Debug, Clone)]
pub struct FrameFields {
    pub time: DateTime<Utc>,
    pub height: FieldSlice,
    pub temperature: FieldSlice,
    pub u_wind: FieldSlice,
    pub v_wind: FieldSlice,
}

impl FrameFields {
    pub fn with_cyclic_point(self) -> FieldResult<FrameFields> {
        Ok(FrameFields {
            time: self.time,
            height: self.height.with_cyclic_point()?,
            temperature: self.temperature.with_cyclic_point()?,
            u_wind: self.u_wind.with_cyclic_point()?,
            v_wind: self.v_wind.with_cyclic_point()?,
        })
    }
}

fn check_same_coordinates(first: &GriddedField, second: &GriddedField) -> FieldResult<()> {
    let mismatch = |axis| FieldError::CoordinateMismatch {
        first: first.name.clone(),
        second: second.name.clone(),
        axis,
    };
    if !axes_equal(&first.lon, &second.lon) {
        return Err(mismatch("longitude"));
    }
    if !axes_equal(&first.lat, &second.lat) {
        return Err(mismatch("latitude"));
    }
    if first.times != second.times {
        return Err(mismatch("time"));
    }
    Ok(())
}

fn axes_equal(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < COORD_EPSILON)
}

fn axis_is_cyclic(lon: &[f64]) -> bool {
    match (lon.first(), lon.last()) {
        (Some(first), Some(last)) if lon.len() > 1 => {
            ((last - first) - 360.0).abs() < GLOBAL_EPSILON
        }
        _ => false,
    }
}

/// A longitude axis closes the globe when its uniform spacing times its
/// length is 360°.
fn check_global(lon: &[f64]) -> FieldResult<()> {
    let n = lon.len();
    if n < 2 {
        return Err(FieldError::NotGlobal(format!("{} longitude points", n)));
    }
    let dlon = lon[1] - lon[0];
    if dlon <= 0.0 {
        return Err(FieldError::NotGlobal("longitudes are not ascending".to_string()));
    }
    let uniform = lon
        .windows(2)
        .all(|w| ((w[1] - w[0]) - dlon).abs() < GLOBAL_EPSILON);
    if !uniform {
        return Err(FieldError::NotGlobal("longitude spacing is not uniform".to_string()));
    }
    let span = dlon * n as f64;
    if (span - 360.0).abs() > GLOBAL_EPSILON {
        return Err(FieldError::NotGlobal(format!(
            "{} points at {}° span {}°",
            n, dlon, span
        )));
    }
    Ok(())
}

fn append_first_column(data: &[f32], rows: usize, cols: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(rows * (cols + 1));
    for row in data.chunks_exact(cols).take(rows) {
        out.extend_from_slice(row);
        out.push(row[0]);
    }
    out
}

fn interp_axis(axis: &[f64], f: f64) -> f64 {
    let n = axis.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return axis[0];
    }
    let f = f.clamp(0.0, (n - 1) as f64);
    let i0 = (f.floor() as usize).min(n - 2);
    let t = f - i0 as f64;
    axis[i0] * (1.0 - t) + axis[i0 + 1] * t
}

fn value_range(data: &[f32]) -> Option<(f32, f32)> {
    data.iter()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
