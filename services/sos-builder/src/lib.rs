//! Builds Science On a Sphere datasets from reanalysis archives.
//!
//! A run reads one year of height, temperature and wind files, renders one
//! globe frame per timestep and writes the bundle the SOS player expects:
//!
//! ```text
//! <output_dir>/playlist.sos
//! <output_dir>/media/0000.png ...
//! <output_dir>/media/colorbar.png
//! <output_dir>/media/thumbnail_small.jpg
//! <output_dir>/media/thumbnail_large.jpg
//! <output_dir>/labels/labels.txt
//! ```

pub mod bundle;
pub mod config;
pub mod pipeline;

pub use config::BuildConfig;
pub use pipeline::{Pipeline, RunSummary};
