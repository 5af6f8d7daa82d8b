//! Reader for yearly reanalysis archives.
//!
//! Each archive holds one variable on a `(time, level, lat, lon)` grid, with
//! coordinate variables named after their dimensions. Values are usually
//! packed as `short` with `scale_factor`/`add_offset`.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sos_common::{GriddedField, TimeUnits, Unit};
use tracing::{debug, info};

use crate::error::{NetCdfError, NetCdfResult};
use crate::native::{get_string_attr, silence_hdf5_errors, Packing};

/// Tolerance for matching a requested pressure level.
const LEVEL_EPSILON: f32 = 0.01;

const LEVEL_NAMES: &[&str] = &["level", "lev", "plev", "isobaric", "pressure"];
const LAT_NAMES: &[&str] = &["lat", "latitude"];
const LON_NAMES: &[&str] = &["lon", "longitude"];
const TIME_NAMES: &[&str] = &["time", "t"];

/// An open reanalysis NetCDF file.
pub struct ReanalysisFile {
    path: PathBuf,
    file: netcdf::File,
}

impl fmt::Debug for ReanalysisFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReanalysisFile").field("path", &self.path).finish()
    }
}

impl ReanalysisFile {
    pub fn open<P: AsRef<Path>>(path: P) -> NetCdfResult<Self> {
        silence_hdf5_errors();

        let path = path.as_ref();
        if !path.exists() {
            return Err(NetCdfError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )));
        }
        let file = netcdf::open(path)
            .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to open {}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Opened reanalysis file");

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn coordinate(&self, names: &[&str]) -> NetCdfResult<netcdf::Variable<'_>> {
        names
            .iter()
            .find_map(|name| self.file.variable(name))
            .ok_or_else(|| NetCdfError::MissingData(format!("coordinate variable {:?}", names)))
    }

    fn read_axis(&self, names: &[&str]) -> NetCdfResult<Vec<f64>> {
        let var = self.coordinate(names)?;
        Ok(var.get_values::<f64, _>(..)?)
    }

    /// Pressure levels in hPa.
    pub fn levels(&self) -> NetCdfResult<Vec<f32>> {
        let var = self.coordinate(LEVEL_NAMES)?;
        let values = var.get_values::<f64, _>(..)?;
        let to_hpa = match get_string_attr(&var, "units").as_deref() {
            Some("Pa") | Some("pascal") | Some("Pascal") => 0.01,
            _ => 1.0,
        };
        Ok(values.into_iter().map(|v| (v * to_hpa) as f32).collect())
    }

    pub fn longitudes(&self) -> NetCdfResult<Vec<f64>> {
        self.read_axis(LON_NAMES)
    }

    pub fn latitudes(&self) -> NetCdfResult<Vec<f64>> {
        self.read_axis(LAT_NAMES)
    }

    /// Decoded time axis.
    pub fn times(&self) -> NetCdfResult<Vec<DateTime<Utc>>> {
        let var = self.coordinate(TIME_NAMES)?;
        let units = get_string_attr(&var, "units")
            .ok_or_else(|| NetCdfError::MissingData("time units attribute".to_string()))?;
        let units = TimeUnits::parse(&units).map_err(|e| NetCdfError::InvalidFormat(e.to_string()))?;
        let offsets = var.get_values::<f64, _>(..)?;
        Ok(offsets.into_iter().map(|o| units.to_datetime(o)).collect())
    }

    /// Names of the non-coordinate variables in the file.
    pub fn data_variables(&self) -> Vec<String> {
        let coordinate_names: Vec<&str> = LEVEL_NAMES
            .iter()
            .chain(LAT_NAMES)
            .chain(LON_NAMES)
            .chain(TIME_NAMES)
            .copied()
            .collect();
        self.file
            .variables()
            .map(|v| v.name())
            .filter(|name| !coordinate_names.contains(&name.as_str()) && !name.ends_with("_bnds"))
            .collect()
    }

    /// Index of a pressure level on the level axis.
    pub fn level_index(&self, level_hpa: f32) -> NetCdfResult<usize> {
        let levels = self.levels()?;
        levels
            .iter()
            .position(|l| (l - level_hpa).abs() < LEVEL_EPSILON)
            .ok_or(NetCdfError::LevelNotFound {
                requested: level_hpa,
                available: levels,
            })
    }

    /// Read `variable` at `level_hpa` for each of `times`.
    ///
    /// Every requested time must be on the file's time axis. The field keeps
    /// the unit stored in the file; callers convert afterwards.
    pub fn read_field(
        &self,
        variable: &str,
        level_hpa: f32,
        times: &[DateTime<Utc>],
    ) -> NetCdfResult<GriddedField> {
        let var = self
            .file
            .variable(variable)
            .ok_or_else(|| NetCdfError::MissingData(format!("variable '{}' in {}", variable, self.path.display())))?;

        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        check_dimension_order(variable, &dims)?;

        let unit_str = get_string_attr(&var, "units")
            .ok_or_else(|| NetCdfError::MissingData(format!("units attribute of '{}'", variable)))?;
        let unit = Unit::parse(&unit_str).map_err(|e| NetCdfError::InvalidFormat(e.to_string()))?;
        let packing = Packing::from_variable(&var);

        let lon = self.longitudes()?;
        let lat = self.latitudes()?;
        let level = self.level_index(level_hpa)?;
        let axis = self.times()?;

        let plane = lat.len() * lon.len();
        let mut data = Vec::with_capacity(plane * times.len());
        for time in times {
            let t = axis
                .iter()
                .position(|a| a == time)
                .ok_or_else(|| NetCdfError::TimeNotFound(time.to_rfc3339()))?;

            let raw = var.get_values::<f32, _>((t, level, .., ..))?;
            if raw.len() != plane {
                return Err(NetCdfError::InvalidFormat(format!(
                    "slice of '{}' has {} values, expected {}",
                    variable,
                    raw.len(),
                    plane
                )));
            }
            data.extend(raw.into_iter().map(|v| packing.unpack(v)));
        }

        info!(
            variable = variable,
            level_hpa = level_hpa,
            times = times.len(),
            nlat = lat.len(),
            nlon = lon.len(),
            unit = %unit,
            "Read reanalysis field"
        );

        Ok(GriddedField::new(
            variable,
            unit,
            level_hpa,
            lon,
            lat,
            times.to_vec(),
            data,
        )?)
    }

    /// Describe the file for the `inspect` command.
    pub fn summary(&self) -> NetCdfResult<DatasetSummary> {
        let variables = self
            .data_variables()
            .into_iter()
            .filter_map(|name| {
                let var = self.file.variable(&name)?;
                Some(VariableSummary {
                    units: get_string_attr(&var, "units"),
                    long_name: get_string_attr(&var, "long_name"),
                    dimensions: var
                        .dimensions()
                        .iter()
                        .map(|d| (d.name(), d.len()))
                        .collect(),
                    name,
                })
            })
            .collect();

        let times = self.times()?;
        Ok(DatasetSummary {
            path: self.path.clone(),
            variables,
            levels: self.levels().unwrap_or_default(),
            nlat: self.latitudes()?.len(),
            nlon: self.longitudes()?.len(),
            ntimes: times.len(),
            first_time: times.first().copied(),
            last_time: times.last().copied(),
        })
    }
}

/// Data variables must be laid out `(time, level, lat, lon)`.
fn check_dimension_order(variable: &str, dims: &[String]) -> NetCdfResult<()> {
    let expected = [TIME_NAMES, LEVEL_NAMES, LAT_NAMES, LON_NAMES];
    let ordered = dims.len() == expected.len()
        && dims
            .iter()
            .zip(expected)
            .all(|(dim, names)| names.contains(&dim.as_str()));
    if ordered {
        Ok(())
    } else {
        Err(NetCdfError::InvalidFormat(format!(
            "'{}' has dimensions {:?}; expected (time, level, lat, lon)",
            variable, dims
        )))
    }
}

/// One data variable in a [`DatasetSummary`].
#[derive(Debug, Clone)]
pub struct VariableSummary {
    pub name: String,
    pub units: Option<String>,
    pub long_name: Option<String>,
    pub dimensions: Vec<(String, usize)>,
}

/// Overview of an archive file.
#[derive(Debug, Clone)]
pub struct DatasetSummary {
    pub path: PathBuf,
    pub variables: Vec<VariableSummary>,
    pub levels: Vec<f32>,
    pub nlat: usize,
    pub nlon: usize,
    pub ntimes: usize,
    pub first_time: Option<DateTime<Utc>>,
    pub last_time: Option<DateTime<Utc>>,
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.path.display())?;
        writeln!(f, "  grid: {} lat x {} lon", self.nlat, self.nlon)?;
        match (self.first_time, self.last_time) {
            (Some(first), Some(last)) => writeln!(
                f,
                "  times: {} ({} .. {})",
                self.ntimes,
                first.format("%Y-%m-%d %H:%M"),
                last.format("%Y-%m-%d %H:%M")
            )?,
            _ => writeln!(f, "  times: {}", self.ntimes)?,
        }
        if !self.levels.is_empty() {
            writeln!(f, "  levels (hPa): {:?}", self.levels)?;
        }
        for var in &self.variables {
            let dims: Vec<String> = var
                .dimensions
                .iter()
                .map(|(name, len)| format!("{}={}", name, len))
                .collect();
            writeln!(
                f,
                "  {} [{}] ({}) {}",
                var.name,
                var.units.as_deref().unwrap_or("?"),
                dims.join(", "),
                var.long_name.as_deref().unwrap_or("")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_dimension_order() {
        assert!(check_dimension_order("hgt", &dims(&["time", "level", "lat", "lon"])).is_ok());
        assert!(check_dimension_order("air", &dims(&["time", "plev", "latitude", "longitude"])).is_ok());
        assert!(matches!(
            check_dimension_order("hgt", &dims(&["time", "level", "lon", "lat"])),
            Err(NetCdfError::InvalidFormat(_))
        ));
        assert!(matches!(
            check_dimension_order("hgt", &dims(&["time", "lat", "lon"])),
            Err(NetCdfError::InvalidFormat(_))
        ));
    }
}
