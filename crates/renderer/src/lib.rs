//! Map rendering for globe frames.
//!
//! Implements the layers of an SOS frame:
//! - Filled color bands (per-pixel sampling through the projection)
//! - Contour lines (marching squares) with inline labels
//! - Wind barbs
//! - Basemap outlines from GeoJSON
//! - Colorbar legend
//!
//! and the PNG encoding and palette quantization used to write them.

pub mod barbs;
pub mod basemap;
pub mod canvas;
pub mod colorbar;
pub mod colormap;
pub mod contour;
pub mod error;
pub mod fill;
pub mod glyphs;
pub mod map;
pub mod png;
pub mod polyline;
pub mod quantize;

pub use colormap::{BandScheme, Color, ColorRamp};
pub use error::{RenderError, RenderResult};
pub use map::{MapLayers, MapRenderer, MapStyle};
