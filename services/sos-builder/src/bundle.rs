//! Output bundle layout: frame names, captions, playlist and thumbnails.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use projection::Orthographic;
use renderer::canvas::flatten;
use renderer::{Color, MapLayers, MapRenderer};
use sos_common::FrameFields;
use tracing::{debug, info};

use crate::config::{LabelConfig, PlaylistConfig, ThumbnailConfig};

pub const MEDIA_DIR: &str = "media";
pub const LABELS_DIR: &str = "labels";
pub const PLAYLIST_FILE: &str = "playlist.sos";
pub const LABELS_FILE: &str = "labels.txt";
pub const COLORBAR_FILE: &str = "colorbar.png";
pub const THUMBNAIL_SMALL: &str = "thumbnail_small.jpg";
pub const THUMBNAIL_LARGE: &str = "thumbnail_large.jpg";

const JPEG_QUALITY: u8 = 90;

// ============================================================================
// Layout
// ============================================================================

/// Directories of one output bundle.
#[derive(Debug, Clone)]
pub struct BundleLayout {
    root: PathBuf,
    media: PathBuf,
    labels: PathBuf,
}

impl BundleLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            media: root.join(MEDIA_DIR),
            labels: root.join(LABELS_DIR),
            root,
        }
    }

    /// Create the directories and delete frames left by an earlier run.
    pub fn prepare(root: impl Into<PathBuf>) -> Result<Self> {
        let layout = Self::new(root);
        for dir in [&layout.media, &layout.labels] {
            std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
        }
        let removed = layout.remove_stale_frames()?;
        info!(root = %layout.root.display(), removed = removed, "Prepared output bundle");
        Ok(layout)
    }

    /// Delete every frame PNG in `media/`. Returns how many were removed.
    pub fn remove_stale_frames(&self) -> Result<usize> {
        let mut removed = 0;
        let entries = std::fs::read_dir(&self.media).with_context(|| format!("Failed to list {:?}", self.media))?;
        for entry in entries {
            let path = entry?.path();
            if is_frame_file(&path) {
                std::fs::remove_file(&path).with_context(|| format!("Failed to remove {:?}", path))?;
                debug!(path = %path.display(), "Removed stale frame");
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn media_dir(&self) -> &Path {
        &self.media
    }

    pub fn frame_path(&self, index: usize, total: usize) -> PathBuf {
        self.media.join(frame_file_name(index, total))
    }

    pub fn labels_path(&self) -> PathBuf {
        self.labels.join(LABELS_FILE)
    }

    pub fn playlist_path(&self) -> PathBuf {
        self.root.join(PLAYLIST_FILE)
    }

    pub fn colorbar_path(&self) -> PathBuf {
        self.media.join(COLORBAR_FILE)
    }

    pub fn thumbnail_paths(&self) -> (PathBuf, PathBuf) {
        (self.media.join(THUMBNAIL_SMALL), self.media.join(THUMBNAIL_LARGE))
    }
}

/// Zero-padded frame name, at least four digits and wide enough for `total`.
pub fn frame_file_name(index: usize, total: usize) -> String {
    let digits = total.saturating_sub(1).to_string().len().max(4);
    format!("{:0width$}.png", index, width = digits)
}

/// A PNG whose stem is all digits.
pub fn is_frame_file(path: &Path) -> bool {
    let is_png = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("png"))
        .unwrap_or(false);
    let numeric = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false);
    is_png && numeric && path.is_file()
}

// ============================================================================
// Labels
// ============================================================================

/// Writes one caption line per frame, in frame order.
pub struct LabelWriter {
    out: BufWriter<File>,
    format: String,
    prefix: Option<String>,
    lines: usize,
}

impl LabelWriter {
    /// Create or truncate the label file.
    pub fn create(path: &Path, config: &LabelConfig) -> Result<Self> {
        let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
        Ok(Self {
            out: BufWriter::new(file),
            format: config.format.clone(),
            prefix: config.prefix.clone(),
            lines: 0,
        })
    }

    /// Caption for a frame time.
    pub fn caption(&self, time: DateTime<Utc>) -> Result<String> {
        let mut line = self.prefix.clone().unwrap_or_default();
        write!(line, "{}", time.format(&self.format))
            .map_err(|_| anyhow::anyhow!("cannot format {} with '{}'", time, self.format))?;
        Ok(line)
    }

    /// Append and flush the caption for the next frame.
    pub fn write(&mut self, time: DateTime<Utc>) -> Result<()> {
        let line = self.caption(time)?;
        writeln!(self.out, "{}", line)?;
        self.out.flush()?;
        self.lines += 1;
        Ok(())
    }

    pub fn lines(&self) -> usize {
        self.lines
    }
}

// ============================================================================
// Playlist
// ============================================================================

/// The `playlist.sos` descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    pub name: String,
    pub description: String,
    /// Frame directory, relative to the playlist
    pub data: String,
    /// Label file, relative to the playlist
    pub label: String,
    pub fps: Option<u32>,
    pub firstdwell: Option<u32>,
    pub lastdwell: Option<u32>,
    pub timer: Option<u32>,
    pub zrotationenable: Option<bool>,
    /// Overlay image, relative to the playlist
    pub pip: Option<String>,
    pub pipheight: Option<f32>,
    pub pipwidth: Option<f32>,
    pub pipvertical: Option<f32>,
    pub piphorizontal: Option<f32>,
}

impl Playlist {
    pub fn from_config(config: &PlaylistConfig) -> Self {
        let pip_enabled = config.pip;
        let pip_value = |v: Option<f32>| if pip_enabled { v } else { None };
        Self {
            name: config.name.clone(),
            description: config.description.clone(),
            data: format!("{}/", MEDIA_DIR),
            label: format!("{}/{}", LABELS_DIR, LABELS_FILE),
            fps: config.fps,
            firstdwell: config.firstdwell,
            lastdwell: config.lastdwell,
            timer: config.timer,
            zrotationenable: config.zrotationenable,
            pip: pip_enabled.then(|| format!("{}/{}", MEDIA_DIR, COLORBAR_FILE)),
            pipheight: pip_value(config.pipheight),
            pipwidth: pip_value(config.pipwidth),
            pipvertical: pip_value(config.pipvertical),
            piphorizontal: pip_value(config.piphorizontal),
        }
    }

    /// `key = value` lines in the fixed key order.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut line = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                // Writing to a String cannot fail
                let _ = writeln!(out, "{} = {}", key, value);
            }
        };
        line("name", Some(self.name.clone()));
        line("description", Some(format!("{{{{ {} }}}}", self.description)));
        line("data", Some(self.data.clone()));
        line("label", Some(self.label.clone()));
        line("fps", self.fps.map(|v| v.to_string()));
        line("firstdwell", self.firstdwell.map(|v| v.to_string()));
        line("lastdwell", self.lastdwell.map(|v| v.to_string()));
        line("timer", self.timer.map(|v| v.to_string()));
        line("zrotationenable", self.zrotationenable.map(|v| u8::from(v).to_string()));
        line("pip", self.pip.clone());
        line("pipheight", self.pipheight.map(format_number));
        line("pipwidth", self.pipwidth.map(format_number));
        line("pipvertical", self.pipvertical.map(format_number));
        line("piphorizontal", self.piphorizontal.map(format_number));
        out
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render()).with_context(|| format!("Failed to write {:?}", path))
    }
}

fn format_number(v: f32) -> String {
    if v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        v.to_string()
    }
}

// ============================================================================
// Thumbnails
// ============================================================================

/// Render the small and large orthographic icons as JPEG.
///
/// The globe is drawn on a transparent background and flattened onto black.
/// Barbs are left off the small icon.
pub fn write_thumbnails(
    renderer: &MapRenderer,
    fields: &FrameFields,
    config: &ThumbnailConfig,
    layout: &BundleLayout,
) -> Result<(PathBuf, PathBuf)> {
    let (small_path, large_path) = layout.thumbnail_paths();
    let small_layers = MapLayers {
        barbs: false,
        ..renderer.layers()
    };

    for (size, path, layers) in [
        (config.small, &small_path, small_layers),
        (config.large, &large_path, renderer.layers()),
    ] {
        let proj = Orthographic::new(size, config.central_lon, config.central_lat)?;
        let mut style = renderer.style().clone();
        style.background = Color::TRANSPARENT;
        let image = MapRenderer::new(style).with_layers(layers).render(&proj, fields)?;
        let rgb = flatten(&image, Color::BLACK);

        let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
        let mut out = BufWriter::new(file);
        JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
            .encode_image(&rgb)
            .with_context(|| format!("Failed to encode {:?}", path))?;
        out.flush()?;
        debug!(path = %path.display(), size = size, "Wrote thumbnail");
    }

    Ok((small_path, large_path))
}
