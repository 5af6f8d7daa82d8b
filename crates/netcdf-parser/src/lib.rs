//! NetCDF reader for gridded atmospheric reanalysis archives.
//!
//! This crate reads the yearly per-variable files of reanalysis datasets
//! such as CFSR and NCEP/NCAR (`hgt.2011.nc`, `air.2011.nc`, `uwnd.2011.nc`,
//! `vwnd.2011.nc`) through the native `netcdf` library.
//!
//! # Data Structure
//!
//! Each file holds a single variable on a `(time, level, lat, lon)` grid.
//! Time is stored as an offset from a CF epoch (`hours since 1800-01-01`),
//! levels are pressure in hPa and values are typically packed shorts.

pub mod error;
pub mod native;
pub mod reader;

use sos_common::Unit;

pub use error::{NetCdfError, NetCdfResult};
pub use native::silence_hdf5_errors;
pub use reader::{DatasetSummary, ReanalysisFile, VariableSummary};

/// The four variables a map frame is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    Height,
    Temperature,
    UWind,
    VWind,
}

impl VariableKind {
    pub const ALL: [VariableKind; 4] = [
        VariableKind::Height,
        VariableKind::Temperature,
        VariableKind::UWind,
        VariableKind::VWind,
    ];

    /// File stem and variable name used by the archive.
    pub fn default_name(&self) -> &'static str {
        match self {
            VariableKind::Height => "hgt",
            VariableKind::Temperature => "air",
            VariableKind::UWind => "uwnd",
            VariableKind::VWind => "vwnd",
        }
    }

    /// Unit the maps are drawn and labelled in.
    pub fn display_unit(&self) -> Unit {
        match self {
            VariableKind::Height => Unit::Decameters,
            VariableKind::Temperature => Unit::Celsius,
            VariableKind::UWind | VariableKind::VWind => Unit::Knots,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            VariableKind::Height => "geopotential height",
            VariableKind::Temperature => "air temperature",
            VariableKind::UWind => "u-wind",
            VariableKind::VWind => "v-wind",
        }
    }
}
