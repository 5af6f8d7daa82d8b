//! End-to-end frame rendering: layers, colorbar and encoding together.

use chrono::{TimeZone, Utc};
use projection::{Equirectangular, Orthographic};
use renderer::barbs::BarbConfig;
use renderer::basemap::{Basemap, BasemapLayer};
use renderer::colorbar::{render_colorbar, ColorbarConfig};
use renderer::contour::ContourStyle;
use renderer::png::write_png;
use renderer::quantize::shrink_png_file;
use renderer::{BandScheme, Color, ColorRamp, MapLayers, MapRenderer, MapStyle};
use sos_common::{FieldSlice, FrameFields, Unit};
use test_utils::{GlobalGrid, COASTLINE_GEOJSON};

// ============================================================================
// Helper functions
// ============================================================================

fn frame(step: f64) -> FrameFields {
    let grid = GlobalGrid::new(step);
    let time = Utc.with_ymd_and_hms(2011, 1, 1, 6, 0, 0).unwrap();
    let slice = |name: &str, unit: Unit, data: Vec<f32>| {
        FieldSlice::from_parts(name, unit, time, grid.lon.clone(), grid.lat.clone(), data).unwrap()
    };
    const KNOTS_PER_MS: f32 = 1.943_844;
    FrameFields {
        time,
        height: slice("hgt", Unit::Decameters, grid.height_field().iter().map(|m| m / 10.0).collect()),
        temperature: slice("air", Unit::Celsius, grid.temperature_field().iter().map(|k| k - 273.15).collect()),
        u_wind: slice("uwnd", Unit::Knots, grid.u_wind_field().iter().map(|w| w * KNOTS_PER_MS).collect()),
        v_wind: slice("vwnd", Unit::Knots, grid.v_wind_field().iter().map(|w| w * KNOTS_PER_MS).collect()),
    }
    .with_cyclic_point()
    .unwrap()
}

fn style() -> MapStyle {
    MapStyle {
        background: Color::BLACK,
        bands: BandScheme::from_range(-50.0, 30.0, 5.0, &ColorRamp::temperature()).unwrap(),
        contour_interval: 6.0,
        contour: ContourStyle::default(),
        barbs: BarbConfig::default(),
        basemap: vec![BasemapLayer {
            basemap: Basemap::from_geojson_str("coastlines", COASTLINE_GEOJSON).unwrap(),
            color: Color::rgb(40, 40, 40),
            width: 1.0,
        }],
    }
}

// ============================================================================
// Frames
// ============================================================================

#[test]
fn test_full_frame_all_layers() {
    let fields = frame(2.5);
    let renderer = MapRenderer::new(style());
    let proj = Equirectangular::global(512, 256, 0.0).unwrap();
    let image = renderer.render(&proj, &fields).unwrap();

    assert_eq!(image.dimensions(), (512, 256));
    // Frames are opaque
    assert!(image.pixels().all(|p| p.0[3] == 255));

    // Strokes add pixels that are not band colors
    let fill_only = MapRenderer::new(style())
        .with_layers(MapLayers {
            fill: true,
            ..MapLayers::none()
        })
        .render(&proj, &fields)
        .unwrap();
    let differing = image
        .pixels()
        .zip(fill_only.pixels())
        .filter(|(a, b)| a != b)
        .count();
    assert!(differing > 1000, "only {} pixels changed by overlays", differing);
}

#[test]
fn test_thumbnail_is_disc() {
    let fields = frame(5.0);
    let renderer = MapRenderer::new(MapStyle {
        background: Color::TRANSPARENT,
        ..style()
    });
    let proj = Orthographic::new(128, -90.0, 30.0).unwrap();
    let image = renderer.render(&proj, &fields).unwrap();

    assert_eq!(image.dimensions(), (128, 128));
    assert_eq!(image.get_pixel(0, 0).0[3], 0);
    assert_eq!(image.get_pixel(64, 64).0[3], 255);
}

#[test]
fn test_frame_encode_and_shrink() {
    let fields = frame(5.0);
    let renderer = MapRenderer::new(style());
    let proj = Equirectangular::global(360, 180, 0.0).unwrap();
    let image = renderer.render(&proj, &fields).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("0000.png");
    let written = write_png(&path, &image).unwrap();
    let stats = shrink_png_file(&path, 256).unwrap();
    assert_eq!(stats.before, written);
    assert!(stats.after <= stats.before);
    assert!(stats.colors <= 256);

    let decoded = image::open(&path).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (360, 180));
}

#[test]
fn test_colorbar_matches_frame_bands() {
    let style = style();
    let config = ColorbarConfig {
        width: 800,
        height: 80,
        ..Default::default()
    };
    let bar = render_colorbar(&style.bands, &config).unwrap();
    assert_eq!(bar.dimensions(), (800, 80));

    // Every band color shows up in the bar
    for color in style.bands.colors() {
        let rgba = color.to_array();
        assert!(bar.pixels().any(|p| p.0 == rgba), "missing band color {}", color);
    }
}
