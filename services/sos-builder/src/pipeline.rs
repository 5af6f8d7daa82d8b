//! The build sequence.
//!
//! load → subset → convert, then for each frame in order:
//! cyclic-pad → render → save PNG → quantize → label.
//! Thumbnails, the colorbar and the playlist are written last.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use netcdf_parser::{ReanalysisFile, VariableKind};
use projection::Equirectangular;
use renderer::barbs::BarbConfig;
use renderer::basemap::{Basemap, BasemapLayer};
use renderer::colorbar::{render_colorbar, ColorbarConfig};
use renderer::contour::ContourStyle;
use renderer::png::write_png;
use renderer::quantize::shrink_png_file;
use renderer::{BandScheme, ColorRamp, MapRenderer, MapStyle};
use sos_common::{FieldSet, FrameSchedule, GriddedField};
use tracing::{info, info_span, warn};

use crate::bundle::{write_thumbnails, BundleLayout, LabelWriter, Playlist};
use crate::config::BuildConfig;

/// What a run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub output_dir: PathBuf,
    pub frames: usize,
    pub first_time: Option<DateTime<Utc>>,
    pub last_time: Option<DateTime<Utc>>,
    /// Frame bytes as first written
    pub bytes_written: u64,
    /// Frame bytes after quantization
    pub bytes_final: u64,
    pub elapsed: Duration,
}

pub struct Pipeline;

impl Pipeline {
    pub fn run(config: &BuildConfig) -> Result<RunSummary> {
        let started = Instant::now();
        let fields = load_datasets(config)?;
        let renderer = MapRenderer::new(build_style(config)?);
        let proj = Equirectangular::global(
            config.output.frame_width,
            config.output.frame_height(),
            config.output.central_longitude,
        )?;

        // Inputs are good; only now clear the previous bundle's frames
        let layout = BundleLayout::prepare(&config.output.output_dir)?;

        let total = fields.times().len();
        let mut labels = LabelWriter::create(&layout.labels_path(), &config.labels)?;
        let mut bytes_written = 0;
        let mut bytes_final = 0;

        for index in 0..total {
            let time = fields.times()[index];
            let span = info_span!("frame", index = index, time = %time);
            let _guard = span.enter();

            let frame = fields.frame(index)?.with_cyclic_point()?;
            let image = renderer.render(&proj, &frame)?;

            let path = layout.frame_path(index, total);
            let written = write_png(&path, &image).with_context(|| format!("Failed to write {:?}", path))?;
            bytes_written += written;

            let size = if config.output.quantize {
                let stats = shrink_png_file(&path, config.output.max_colors)
                    .with_context(|| format!("Failed to quantize {:?}", path))?;
                stats.after
            } else {
                written
            };
            bytes_final += size;

            labels.write(time)?;
            info!(frame = index + 1, total = total, bytes = size, "Wrote frame");
        }

        let first = fields.frame(0)?.with_cyclic_point()?;
        write_thumbnails(&renderer, &first, &config.thumbnails, &layout)?;

        let colorbar = render_colorbar(
            &renderer.style().bands,
            &ColorbarConfig {
                width: config.colorbar.width,
                height: config.colorbar.height,
                label_every: config.colorbar.label_every,
                text_color: config.colorbar.text_color,
            },
        )?;
        write_png(&layout.colorbar_path(), &colorbar)?;

        Playlist::from_config(&config.playlist).write(&layout.playlist_path())?;

        let summary = RunSummary {
            output_dir: layout.root().to_path_buf(),
            frames: total,
            first_time: fields.times().first().copied(),
            last_time: fields.times().last().copied(),
            bytes_written,
            bytes_final,
            elapsed: started.elapsed(),
        };
        info!(
            output = %summary.output_dir.display(),
            frames = summary.frames,
            bytes_written = summary.bytes_written,
            bytes_final = summary.bytes_final,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Bundle complete"
        );
        Ok(summary)
    }
}

/// Load the four variables at the configured level and times, in display units.
pub fn load_datasets(config: &BuildConfig) -> Result<FieldSet> {
    let dataset = &config.dataset;
    let selection = &config.selection;

    let height_file = open(config, VariableKind::Height)?;
    let available = height_file.times()?;
    let schedule = FrameSchedule::new(
        selection.start_time(dataset.year)?,
        selection.step_hours,
        selection.frames,
    );
    let times = schedule.timestamps(&available);
    if times.is_empty() {
        bail!(
            "no frames scheduled: start {} is after the last time in {:?}",
            schedule.start,
            height_file.path()
        );
    }
    info!(
        frames = times.len(),
        first = %times[0],
        step_hours = selection.step_hours,
        level_hpa = selection.level_hpa,
        "Frame schedule"
    );

    let read = |kind: VariableKind, file: &ReanalysisFile| -> Result<GriddedField> {
        let mut field = file
            .read_field(dataset.variable_name(kind), selection.level_hpa, &times)
            .with_context(|| format!("Failed to read {} from {:?}", kind.description(), file.path()))?;
        field.convert_to(kind.display_unit())?;
        Ok(field)
    };

    let height = read(VariableKind::Height, &height_file)?;
    let temperature = read(VariableKind::Temperature, &open(config, VariableKind::Temperature)?)?;
    let u_wind = read(VariableKind::UWind, &open(config, VariableKind::UWind)?)?;
    let v_wind = read(VariableKind::VWind, &open(config, VariableKind::VWind)?)?;

    Ok(FieldSet::new(height, temperature, u_wind, v_wind)?)
}

fn open(config: &BuildConfig, kind: VariableKind) -> Result<ReanalysisFile> {
    let path = config.dataset.path_for(kind);
    ReanalysisFile::open(&path).with_context(|| format!("Failed to open {} file {:?}", kind.description(), path))
}

/// Map style from the configuration. Missing basemap files are skipped.
pub fn build_style(config: &BuildConfig) -> Result<MapStyle> {
    let style = &config.style;
    let ramp = ColorRamp::by_name(&style.temperature.colormap)
        .with_context(|| format!("unknown colormap '{}'", style.temperature.colormap))?;
    let bands = BandScheme::from_range(
        style.temperature.min,
        style.temperature.max,
        style.temperature.interval,
        &ramp,
    )?;

    let mut basemap = Vec::new();
    for layer in &style.basemap {
        if !layer.path.exists() {
            warn!(path = %layer.path.display(), "Basemap file not found; skipping layer");
            continue;
        }
        basemap.push(BasemapLayer {
            basemap: Basemap::from_geojson_file(&layer.path)?,
            color: layer.color,
            width: layer.width,
        });
    }

    let contours = &style.height_contours;
    Ok(MapStyle {
        background: style.background,
        bands,
        contour_interval: contours.interval,
        contour: ContourStyle {
            color: contours.color,
            line_width: contours.width,
            smoothing_passes: contours.smoothing,
            labels_enabled: contours.labels,
            label_size: contours.label_size,
            ..ContourStyle::default()
        },
        barbs: BarbConfig {
            stride: style.barbs.stride,
            length: style.barbs.length,
            line_width: style.barbs.line_width,
            color: style.barbs.color,
            flip_southern: style.barbs.flip_southern,
        },
        basemap,
    })
}
