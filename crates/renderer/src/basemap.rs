//! Coastline, border and state outlines loaded from GeoJSON.

use std::path::Path;

use projection::MapProjection;
use serde::Deserialize;
use serde_json::Value;
use tiny_skia::Pixmap;

use crate::colormap::Color;
use crate::error::{RenderError, RenderResult};
use crate::polyline::{project_polyline, stroke_polyline};

/// A GeoJSON position; altitude and extra members are ignored.
type Position = Vec<f64>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    LineString {
        coordinates: Vec<Position>,
    },
    MultiLineString {
        coordinates: Vec<Vec<Position>>,
    },
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    GeometryCollection {
        geometries: Vec<Geometry>,
    },
    /// Points and anything else that has no outline
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

/// Outline geometry as `(lon, lat)` polylines.
#[derive(Debug, Clone, Default)]
pub struct Basemap {
    pub name: String,
    lines: Vec<Vec<(f64, f64)>>,
}

impl Basemap {
    /// Parse a FeatureCollection, a single Feature or a bare geometry.
    pub fn from_geojson_str(name: impl Into<String>, json: &str) -> RenderResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| RenderError::GeoJson("missing \"type\" member".to_string()))?
            .to_string();

        let mut lines = Vec::new();
        match kind.as_str() {
            "FeatureCollection" => {
                let collection: FeatureCollection = serde_json::from_value(value)?;
                for geometry in collection.features.into_iter().filter_map(|f| f.geometry) {
                    collect_lines(geometry, &mut lines);
                }
            }
            "Feature" => {
                let feature: Feature = serde_json::from_value(value)?;
                if let Some(geometry) = feature.geometry {
                    collect_lines(geometry, &mut lines);
                }
            }
            _ => collect_lines(serde_json::from_value(value)?, &mut lines),
        }

        Ok(Self {
            name: name.into(),
            lines,
        })
    }

    /// Load a GeoJSON file; the layer is named after the file stem.
    pub fn from_geojson_file(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let basemap = Self::from_geojson_str(name, &json)
            .map_err(|e| RenderError::GeoJson(format!("{}: {}", path.display(), e)))?;

        tracing::info!(
            path = %path.display(),
            lines = basemap.lines.len(),
            points = basemap.point_count(),
            "Loaded basemap"
        );
        Ok(basemap)
    }

    pub fn lines(&self) -> &[Vec<(f64, f64)>] {
        &self.lines
    }

    pub fn point_count(&self) -> usize {
        self.lines.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

fn to_line(positions: Vec<Position>) -> Vec<(f64, f64)> {
    positions
        .into_iter()
        .filter(|p| p.len() >= 2)
        .map(|p| (p[0], p[1]))
        .collect()
}

fn push_line(out: &mut Vec<Vec<(f64, f64)>>, positions: Vec<Position>) {
    let line = to_line(positions);
    if line.len() >= 2 {
        out.push(line);
    }
}

fn collect_lines(geometry: Geometry, out: &mut Vec<Vec<(f64, f64)>>) {
    match geometry {
        Geometry::LineString { coordinates } => push_line(out, coordinates),
        Geometry::MultiLineString { coordinates } | Geometry::Polygon { coordinates } => {
            for ring in coordinates {
                push_line(out, ring);
            }
        }
        Geometry::MultiPolygon { coordinates } => {
            for ring in coordinates.into_iter().flatten() {
                push_line(out, ring);
            }
        }
        Geometry::GeometryCollection { geometries } => {
            for g in geometries {
                collect_lines(g, out);
            }
        }
        Geometry::Other => {}
    }
}

/// One outline layer and how to stroke it.
#[derive(Debug, Clone)]
pub struct BasemapLayer {
    pub basemap: Basemap,
    pub color: Color,
    /// Line width in pixels
    pub width: f32,
}

/// Stroke each layer in order, splitting lines at the seam and at the limb.
pub fn draw_basemap<P: MapProjection + ?Sized>(pixmap: &mut Pixmap, proj: &P, layers: &[BasemapLayer]) {
    for layer in layers {
        let mut parts = 0;
        for line in layer.basemap.lines() {
            for part in project_polyline(proj, line) {
                stroke_polyline(pixmap, &part, layer.color, layer.width);
                parts += 1;
            }
        }
        tracing::debug!(layer = %layer.basemap.name, parts = parts, "Drew basemap layer");
    }
}
