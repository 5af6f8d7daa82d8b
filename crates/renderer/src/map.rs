//! Layer composition for a complete map.
//!
//! Layers are drawn bottom to top: background, filled temperature bands,
//! basemap outlines, height contours with labels, wind barbs. The same
//! renderer draws equirectangular frames and orthographic thumbnails.

use image::RgbaImage;
use projection::MapProjection;
use sos_common::FrameFields;
use tracing::debug;

use crate::barbs::{draw_wind_barbs, BarbConfig};
use crate::basemap::{draw_basemap, BasemapLayer};
use crate::canvas::{composite_over, image_to_pixmap, pixmap_to_image, solid_image};
use crate::colormap::{BandScheme, Color};
use crate::contour::{draw_geo_contours, generate_contour_levels, geo_contours, ContourStyle};
use crate::error::{RenderError, RenderResult};
use crate::fill::render_filled_bands;

/// Which layers to draw. Everything is on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapLayers {
    pub fill: bool,
    pub basemap: bool,
    pub contours: bool,
    pub barbs: bool,
}

impl Default for MapLayers {
    fn default() -> Self {
        Self {
            fill: true,
            basemap: true,
            contours: true,
            barbs: true,
        }
    }
}

impl MapLayers {
    pub fn none() -> Self {
        Self {
            fill: false,
            basemap: false,
            contours: false,
            barbs: false,
        }
    }
}

/// Styling shared by every frame of a run.
#[derive(Debug, Clone)]
pub struct MapStyle {
    pub background: Color,
    /// Temperature bands
    pub bands: BandScheme,
    /// Height contour interval, in the height field's unit
    pub contour_interval: f32,
    pub contour: ContourStyle,
    pub barbs: BarbConfig,
    pub basemap: Vec<BasemapLayer>,
}

/// Renders [`FrameFields`] through a projection.
#[derive(Debug, Clone)]
pub struct MapRenderer {
    style: MapStyle,
    layers: MapLayers,
}

impl MapRenderer {
    pub fn new(style: MapStyle) -> Self {
        Self {
            style,
            layers: MapLayers::default(),
        }
    }

    pub fn with_layers(mut self, layers: MapLayers) -> Self {
        self.layers = layers;
        self
    }

    pub fn style(&self) -> &MapStyle {
        &self.style
    }

    pub fn layers(&self) -> MapLayers {
        self.layers
    }

    /// Height contour levels for one frame.
    pub fn contour_levels(&self, fields: &FrameFields) -> Vec<f32> {
        match fields.height.value_range() {
            Some((min, max)) => generate_contour_levels(min, max, self.style.contour_interval),
            None => Vec::new(),
        }
    }

    /// Draw one map of `fields`.
    pub fn render<P: MapProjection + ?Sized>(&self, proj: &P, fields: &FrameFields) -> RenderResult<RgbaImage> {
        let (width, height) = proj.size();
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidSize { width, height });
        }

        let mut image = solid_image(width, height, self.style.background);
        if self.layers.fill {
            let bands = render_filled_bands(&fields.temperature, proj, &self.style.bands)?;
            composite_over(&mut image, &bands);
        }

        let mut pixmap = image_to_pixmap(&image)?;
        if self.layers.basemap {
            draw_basemap(&mut pixmap, proj, &self.style.basemap);
        }

        let mut contour_count = 0;
        let mut label_count = 0;
        if self.layers.contours {
            let levels = self.contour_levels(fields);
            let contours = geo_contours(&fields.height, &levels, self.style.contour.smoothing_passes);
            contour_count = contours.len();
            label_count = draw_geo_contours(&mut pixmap, proj, &contours, &self.style.contour);
        }

        let mut barb_count = 0;
        if self.layers.barbs {
            barb_count = draw_wind_barbs(&mut pixmap, proj, &fields.u_wind, &fields.v_wind, &self.style.barbs);
        }

        debug!(
            time = %fields.time,
            width = width,
            height = height,
            contours = contour_count,
            labels = label_count,
            barbs = barb_count,
            "Rendered map"
        );
        Ok(pixmap_to_image(&pixmap))
    }
}
