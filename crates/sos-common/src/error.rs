//! Error types for gridded field operations.

use thiserror::Error;

use crate::time::TimeParseError;
use crate::units::UnitError;

/// Result type alias using FieldError.
pub type FieldResult<T> = Result<T, FieldError>;

/// Errors raised while building, slicing or converting gridded fields.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("Data length {actual} does not match shape {times}x{lat}x{lon}")]
    ShapeMismatch {
        actual: usize,
        times: usize,
        lat: usize,
        lon: usize,
    },

    #[error("Fields '{first}' and '{second}' do not share {axis} coordinates")]
    CoordinateMismatch {
        first: String,
        second: String,
        axis: &'static str,
    },

    #[error("Longitude axis does not span the globe: {0}")]
    NotGlobal(String),

    #[error("Field '{0}' already carries a cyclic point")]
    AlreadyCyclic(String),

    #[error("Time index {index} out of range ({len} times available)")]
    TimeOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Unit(#[from] UnitError),

    #[error(transparent)]
    Time(#[from] TimeParseError),
}
