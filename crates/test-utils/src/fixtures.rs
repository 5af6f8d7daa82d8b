//! Common test fixtures for sos-frames tests.

use std::path::{Path, PathBuf};

/// A coastline-like GeoJSON FeatureCollection with one LineString crossing
/// the date line and one Polygon.
pub const COASTLINE_GEOJSON: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": { "name": "dateline" },
      "geometry": {
        "type": "LineString",
        "coordinates": [[170.0, 10.0], [179.0, 12.0], [-179.0, 14.0], [-170.0, 16.0]]
      }
    },
    {
      "type": "Feature",
      "properties": { "name": "island" },
      "geometry": {
        "type": "Polygon",
        "coordinates": [[[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [0.0, 0.0]]]
      }
    }
  ]
}"#;

/// A bare MultiLineString geometry, as some border files ship.
pub const BORDERS_GEOJSON: &str = r#"{
  "type": "MultiLineString",
  "coordinates": [
    [[-100.0, 49.0], [-95.0, 49.0]],
    [[-110.0, 31.0], [-108.0, 31.8]]
  ]
}"#;

/// Write a GeoJSON fixture into `dir` and return its path.
pub fn write_geojson_fixture(dir: &Path, name: &str, contents: &str) -> std::io::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, contents)?;
    Ok(path)
}

/// Create a temporary directory for output bundles.
pub fn temp_output_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("failed to create temp dir")
}
