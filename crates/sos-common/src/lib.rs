//! Common types shared across the sos-frames workspace.
//!
//! - [`grid`]: gridded fields on a regular lat/lon axis, slices and the cyclic point
//! - [`units`]: physical units and conversions (m/dam, K/°C, m/s/kt)
//! - [`time`]: CF time axis decoding and frame schedules

pub mod error;
pub mod grid;
pub mod time;
pub mod units;

pub use error::{FieldError, FieldResult};
pub use grid::{FieldSet, FieldSlice, FrameFields, GriddedField};
pub use time::{FrameSchedule, TimeParseError, TimeUnits};
pub use units::{convert, Unit, UnitError};
