//! Physical units and conversions.
//!
//! Reanalysis archives tag variables with CF/COARDS unit strings (`m`,
//! `degK`, `m/s`). Maps are labelled in the customary upper-air units:
//! decameters for height, Celsius for temperature and knots for wind.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Meters per second in one knot.
pub const METERS_PER_SECOND_PER_KNOT: f32 = 0.514_444;

/// Offset between Kelvin and Celsius.
pub const KELVIN_OFFSET: f32 = 273.15;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    #[error("Unknown unit string: '{0}'")]
    Unknown(String),

    #[error("Cannot convert {from} to {to}")]
    Incompatible { from: Unit, to: Unit },
}

/// Physical unit tag carried by a gridded field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Meters,
    Decameters,
    Kelvin,
    Celsius,
    MetersPerSecond,
    Knots,
    Dimensionless,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Length,
    Temperature,
    Speed,
    None,
}

impl Unit {
    /// Parse a CF/COARDS unit attribute.
    pub fn parse(s: &str) -> Result<Self, UnitError> {
        let normalized = s.trim();
        let unit = match normalized {
            "m" | "gpm" | "meters" | "metre" | "metres" | "meter" => Unit::Meters,
            "dam" | "decameters" | "decametres" => Unit::Decameters,
            "K" | "degK" | "deg K" | "kelvin" | "Kelvin" => Unit::Kelvin,
            "C" | "degC" | "deg C" | "celsius" | "Celsius" | "°C" => Unit::Celsius,
            "m/s" | "m s-1" | "m s**-1" | "m s^-1" | "m/sec" => Unit::MetersPerSecond,
            "kt" | "kts" | "knot" | "knots" => Unit::Knots,
            "1" | "" | "dimensionless" => Unit::Dimensionless,
            other => return Err(UnitError::Unknown(other.to_string())),
        };
        Ok(unit)
    }

    /// Short symbol used in captions and logs.
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Meters => "m",
            Unit::Decameters => "dam",
            Unit::Kelvin => "K",
            Unit::Celsius => "°C",
            Unit::MetersPerSecond => "m/s",
            Unit::Knots => "kt",
            Unit::Dimensionless => "1",
        }
    }

    fn dimension(&self) -> Dimension {
        match self {
            Unit::Meters | Unit::Decameters => Dimension::Length,
            Unit::Kelvin | Unit::Celsius => Dimension::Temperature,
            Unit::MetersPerSecond | Unit::Knots => Dimension::Speed,
            Unit::Dimensionless => Dimension::None,
        }
    }

    /// Convert a value in this unit to the dimension's base unit (m, K, m/s).
    fn to_base(self, value: f32) -> f32 {
        match self {
            Unit::Decameters => value * 10.0,
            Unit::Celsius => value + KELVIN_OFFSET,
            Unit::Knots => value * METERS_PER_SECOND_PER_KNOT,
            _ => value,
        }
    }

    fn from_base(self, value: f32) -> f32 {
        match self {
            Unit::Decameters => value / 10.0,
            Unit::Celsius => value - KELVIN_OFFSET,
            Unit::Knots => value / METERS_PER_SECOND_PER_KNOT,
            _ => value,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Convert a single value between units of the same dimension.
pub fn convert(value: f32, from: Unit, to: Unit) -> Result<f32, UnitError> {
    if from == to {
        return Ok(value);
    }
    if from.dimension() != to.dimension() {
        return Err(UnitError::Incompatible { from, to });
    }
    Ok(to.from_base(from.to_base(value)))
}

/// Build a converter closure, checking compatibility once up front.
pub fn converter(from: Unit, to: Unit) -> Result<impl Fn(f32) -> f32, UnitError> {
    if from != to && from.dimension() != to.dimension() {
        return Err(UnitError::Incompatible { from, to });
    }
    Ok(move |v: f32| to.from_base(from.to_base(v)))
}
