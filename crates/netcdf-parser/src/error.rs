//! Error types for NetCDF parsing operations.

use sos_common::FieldError;
use thiserror::Error;

/// Result type for NetCDF parser operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF parsing.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Missing required variable or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Requested pressure level is not on the level axis
    #[error("Level {requested} hPa not found; available: {available:?}")]
    LevelNotFound { requested: f32, available: Vec<f32> },

    /// Requested timestamp is not on the time axis
    #[error("Time {0} not found in dataset")]
    TimeNotFound(String),

    /// Error reported by libnetcdf
    #[error("NetCDF library error: {0}")]
    Netcdf(String),

    /// The decoded values could not form a valid field
    #[error(transparent)]
    Field(#[from] FieldError),
}

impl From<netcdf::Error> for NetCdfError {
    fn from(err: netcdf::Error) -> Self {
        NetCdfError::Netcdf(err.to_string())
    }
}
