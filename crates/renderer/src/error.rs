//! Error types for rendering and image output.

use projection::ProjectionError;
use thiserror::Error;

/// Result type alias using RenderError.
pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Invalid image size: {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("PNG encoding failed: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid GeoJSON: {0}")]
    GeoJson(String),

    #[error("Invalid color scale: {0}")]
    InvalidScale(String),

    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        RenderError::GeoJson(err.to_string())
    }
}
