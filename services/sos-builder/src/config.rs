//! YAML configuration for a build.
//!
//! Every section has defaults, so a minimal file only names the data
//! directory and year. Paths and free-text strings accept `${VAR}` and `~`
//! expansion.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone, Utc};
use netcdf_parser::VariableKind;
use renderer::Color;
use serde::{Deserialize, Serialize};
use sos_common::time::parse_iso8601;

// ============================================================================
// Top level
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub dataset: DatasetConfig,
    pub selection: SelectionConfig,
    pub output: OutputConfig,
    pub style: StyleConfig,
    pub thumbnails: ThumbnailConfig,
    pub colorbar: ColorbarSection,
    pub labels: LabelConfig,
    pub playlist: PlaylistConfig,
}

impl BuildConfig {
    /// Read, expand and validate a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config = Self::from_yaml(&content).with_context(|| format!("Invalid config {:?}", path))?;
        tracing::info!(path = %path.display(), year = config.dataset.year, "Loaded configuration");
        Ok(config)
    }

    /// Parse, expand and validate YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut config: BuildConfig = serde_yaml::from_str(content).context("Failed to parse config YAML")?;
        config.expand()?;
        config.validate()?;
        Ok(config)
    }

    fn expand(&mut self) -> Result<()> {
        self.dataset.data_dir = expand_path(&self.dataset.data_dir)?;
        self.output.output_dir = expand_path(&self.output.output_dir)?;
        for layer in &mut self.style.basemap {
            layer.path = expand_path(&layer.path)?;
        }
        self.playlist.name = expand(&self.playlist.name)?;
        self.playlist.description = expand(&self.playlist.description)?;
        if let Some(prefix) = &self.labels.prefix {
            self.labels.prefix = Some(expand(prefix)?);
        }
        Ok(())
    }

    /// Reject settings that cannot produce a bundle.
    pub fn validate(&self) -> Result<()> {
        let output = &self.output;
        if output.frame_width == 0 {
            bail!("output.frame_width must be positive");
        }
        if output.frame_height() % 2 != 0 {
            bail!(
                "output.frame_width {} gives an odd frame height {}; use a multiple of 4",
                output.frame_width,
                output.frame_height()
            );
        }
        if !(2..=256).contains(&output.max_colors) {
            bail!("output.max_colors must be in 2..=256, got {}", output.max_colors);
        }

        let style = &self.style;
        if !(style.temperature.interval > 0.0) {
            bail!("style.temperature.interval must be positive");
        }
        if !(style.temperature.max > style.temperature.min) {
            bail!("style.temperature.max must be above min");
        }
        if !(style.height_contours.interval > 0.0) {
            bail!("style.height_contours.interval must be positive");
        }
        if style.barbs.stride == 0 {
            bail!("style.barbs.stride must be at least 1");
        }
        if renderer::ColorRamp::by_name(&style.temperature.colormap).is_none() {
            bail!("unknown colormap '{}'", style.temperature.colormap);
        }

        if self.selection.step_hours == 0 {
            bail!("selection.step_hours must be positive");
        }
        if self.selection.frames == Some(0) {
            bail!("selection.frames must be positive when set");
        }
        if self.thumbnails.small == 0 || self.thumbnails.large == 0 {
            bail!("thumbnail sizes must be positive");
        }
        if self.colorbar.width == 0 || self.colorbar.height == 0 {
            bail!("colorbar size must be positive");
        }
        if StrftimeItems::new(&self.labels.format).any(|item| matches!(item, Item::Error)) {
            bail!("labels.format '{}' is not a valid strftime format", self.labels.format);
        }
        Ok(())
    }
}

fn expand(s: &str) -> Result<String> {
    Ok(shellexpand::full(s)
        .with_context(|| format!("Failed to expand '{}'", s))?
        .into_owned())
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    Ok(PathBuf::from(expand(&path.to_string_lossy())?))
}

// ============================================================================
// Sections
// ============================================================================

/// Where the yearly files live and what they are called.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub data_dir: PathBuf,
    pub year: i32,
    /// File name with `{var}` and `{year}` placeholders
    pub file_template: String,
    pub height: VariableSource,
    pub temperature: VariableSource,
    pub u_wind: VariableSource,
    pub v_wind: VariableSource,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            year: 2011,
            file_template: "{var}.{year}.nc".to_string(),
            height: VariableSource::default(),
            temperature: VariableSource::default(),
            u_wind: VariableSource::default(),
            v_wind: VariableSource::default(),
        }
    }
}

/// Overrides for one variable's file stem and variable name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableSource {
    pub file: Option<String>,
    pub variable: Option<String>,
}

impl DatasetConfig {
    fn source(&self, kind: VariableKind) -> &VariableSource {
        match kind {
            VariableKind::Height => &self.height,
            VariableKind::Temperature => &self.temperature,
            VariableKind::UWind => &self.u_wind,
            VariableKind::VWind => &self.v_wind,
        }
    }

    /// Path of the yearly file holding `kind`.
    pub fn path_for(&self, kind: VariableKind) -> PathBuf {
        let stem = self.source(kind).file.as_deref().unwrap_or(kind.default_name());
        let name = self
            .file_template
            .replace("{var}", stem)
            .replace("{year}", &self.year.to_string());
        self.data_dir.join(name)
    }

    /// Name of the data variable inside the file.
    pub fn variable_name(&self, kind: VariableKind) -> &str {
        self.source(kind).variable.as_deref().unwrap_or(kind.default_name())
    }
}

/// Level and timestamps to draw.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub level_hpa: f32,
    /// First frame; January 1st 00Z of the dataset year when unset.
    /// Accepts RFC 3339, a naive date-time or a bare date, all in UTC.
    #[serde(deserialize_with = "deserialize_start")]
    pub start: Option<DateTime<Utc>>,
    pub step_hours: u32,
    /// Number of frames; runs to the end of the data when unset
    pub frames: Option<usize>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            level_hpa: 500.0,
            start: None,
            step_hours: 6,
            frames: None,
        }
    }
}

fn deserialize_start<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    value
        .map(|s| parse_iso8601(s.trim()).map_err(serde::de::Error::custom))
        .transpose()
}

impl SelectionConfig {
    pub fn start_time(&self, year: i32) -> Result<DateTime<Utc>> {
        match self.start {
            Some(start) => Ok(start),
            None => Utc
                .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
                .single()
                .with_context(|| format!("invalid dataset year {}", year)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub output_dir: PathBuf,
    /// Frame width in pixels; the height is half of it
    pub frame_width: u32,
    pub central_longitude: f64,
    /// Shrink frames to an indexed palette after writing
    pub quantize: bool,
    pub max_colors: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("sos_output"),
            frame_width: 2048,
            central_longitude: 0.0,
            quantize: true,
            max_colors: 256,
        }
    }
}

impl OutputConfig {
    pub fn frame_height(&self) -> u32 {
        self.frame_width / 2
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub background: Color,
    pub temperature: BandsConfig,
    pub height_contours: HeightContourConfig,
    pub barbs: BarbsConfig,
    pub basemap: Vec<BasemapLayerConfig>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            background: Color::BLACK,
            temperature: BandsConfig::default(),
            height_contours: HeightContourConfig::default(),
            barbs: BarbsConfig::default(),
            basemap: Vec::new(),
        }
    }
}

/// Filled temperature bands, in °C.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BandsConfig {
    pub min: f32,
    pub max: f32,
    pub interval: f32,
    pub colormap: String,
}

impl Default for BandsConfig {
    fn default() -> Self {
        Self {
            min: -50.0,
            max: 30.0,
            interval: 2.0,
            colormap: "temperature".to_string(),
        }
    }
}

/// Height contour lines, in dam.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightContourConfig {
    pub interval: f32,
    pub color: Color,
    pub width: f32,
    pub labels: bool,
    pub label_size: f32,
    pub smoothing: u32,
}

impl Default for HeightContourConfig {
    fn default() -> Self {
        Self {
            interval: 6.0,
            color: Color::BLACK,
            width: 1.5,
            labels: true,
            label_size: 12.0,
            smoothing: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BarbsConfig {
    pub stride: usize,
    pub length: f32,
    pub color: Color,
    pub line_width: f32,
    pub flip_southern: bool,
}

impl Default for BarbsConfig {
    fn default() -> Self {
        Self {
            stride: 4,
            length: 18.0,
            color: Color::BLACK,
            line_width: 1.2,
            flip_southern: false,
        }
    }
}

/// One GeoJSON outline file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasemapLayerConfig {
    pub path: PathBuf,
    #[serde(default = "default_basemap_color")]
    pub color: Color,
    #[serde(default = "default_basemap_width")]
    pub width: f32,
}

fn default_basemap_color() -> Color {
    Color::rgb(64, 64, 64)
}

fn default_basemap_width() -> f32 {
    1.0
}

/// Orthographic icons drawn from the first frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    pub small: u32,
    pub large: u32,
    pub central_lon: f64,
    pub central_lat: f64,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            small: 128,
            large: 800,
            central_lon: -90.0,
            central_lat: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorbarSection {
    pub width: u32,
    pub height: u32,
    pub label_every: usize,
    pub text_color: Color,
}

impl Default for ColorbarSection {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 120,
            label_every: 5,
            text_color: Color::WHITE,
        }
    }
}

/// Caption format for `labels.txt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// chrono strftime format
    pub format: String,
    pub prefix: Option<String>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            format: "%Y-%m-%d %H:%M UTC".to_string(),
            prefix: None,
        }
    }
}

/// Settings copied into `playlist.sos`. Unset options are left out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistConfig {
    pub name: String,
    pub description: String,
    pub fps: Option<u32>,
    pub firstdwell: Option<u32>,
    pub lastdwell: Option<u32>,
    pub timer: Option<u32>,
    pub zrotationenable: Option<bool>,
    /// Show the colorbar as a picture-in-picture overlay
    pub pip: bool,
    pub pipheight: Option<f32>,
    pub pipwidth: Option<f32>,
    pub pipvertical: Option<f32>,
    pub piphorizontal: Option<f32>,
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            name: "500 mb Heights, Temperature and Winds".to_string(),
            description: "Geopotential height contours, filled temperature and wind barbs on a pressure level."
                .to_string(),
            fps: Some(12),
            firstdwell: Some(1000),
            lastdwell: Some(2000),
            timer: None,
            zrotationenable: Some(true),
            pip: true,
            pipheight: Some(14.0),
            pipwidth: Some(40.0),
            pipvertical: Some(-30.0),
            piphorizontal: Some(0.0),
        }
    }
}
