//! Configuration parsing and validation.

use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use renderer::Color;
use sos_builder::BuildConfig;

#[test]
fn test_example_config_parses() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/example.yaml");
    let config = BuildConfig::load(&path).unwrap();

    assert_eq!(config.dataset.year, 2011);
    assert_eq!(config.selection.level_hpa, 500.0);
    assert_eq!(config.output.frame_width, 2048);
    assert_eq!(config.output.frame_height(), 1024);
    assert_eq!(config.style.temperature.colormap, "temperature");
    assert_eq!(config.style.basemap.len(), 1);
    assert_eq!(config.colorbar.text_color, Color::WHITE);
    assert_eq!(config.playlist.fps, Some(12));
    assert!(config.playlist.pip);
}

#[test]
fn test_sections_override_defaults() {
    let yaml = r##"
dataset:
  data_dir: /data/ncep
  year: 1999
selection:
  level_hpa: 250
  start: 1999-06-01T12:00:00Z
  frames: 8
style:
  barbs:
    color: "#ff000080"
    flip_southern: true
labels:
  format: "%d %b %Y %HZ"
  prefix: "250 mb  "
"##;
    let config = BuildConfig::from_yaml(yaml).unwrap();

    assert_eq!(config.dataset.data_dir, PathBuf::from("/data/ncep"));
    assert_eq!(config.selection.level_hpa, 250.0);
    assert_eq!(config.selection.frames, Some(8));
    assert_eq!(
        config.selection.start_time(config.dataset.year).unwrap(),
        Utc.with_ymd_and_hms(1999, 6, 1, 12, 0, 0).unwrap()
    );
    assert_eq!(config.style.barbs.color, Color::new(255, 0, 0, 128));
    assert!(config.style.barbs.flip_southern);
    // Untouched fields keep their defaults
    assert_eq!(config.style.barbs.stride, 4);
    assert_eq!(config.labels.prefix.as_deref(), Some("250 mb  "));
}

#[test]
fn test_start_accepts_date_only_and_naive_forms() {
    let config = BuildConfig::from_yaml("selection:\n  start: 2011-03-01\n").unwrap();
    assert_eq!(config.selection.start, Some(Utc.with_ymd_and_hms(2011, 3, 1, 0, 0, 0).unwrap()));

    let config = BuildConfig::from_yaml("selection:\n  start: \"2011-03-01 18:00:00\"\n").unwrap();
    assert_eq!(config.selection.start, Some(Utc.with_ymd_and_hms(2011, 3, 1, 18, 0, 0).unwrap()));

    let config = BuildConfig::from_yaml("selection:\n  start: null\n").unwrap();
    assert_eq!(config.selection.start, None);

    assert!(BuildConfig::from_yaml("selection:\n  start: March first\n").is_err());
}

#[test]
fn test_environment_variables_are_expanded() {
    std::env::set_var("SOS_TEST_OUTPUT_ROOT", "/tmp/sos-expanded");
    let config = BuildConfig::from_yaml("output:\n  output_dir: ${SOS_TEST_OUTPUT_ROOT}/bundle\n").unwrap();
    assert_eq!(config.output.output_dir, PathBuf::from("/tmp/sos-expanded/bundle"));
}

#[test]
fn test_invalid_settings_are_rejected() {
    let cases = [
        "output:\n  frame_width: 0\n",
        "output:\n  frame_width: 2046\n",
        "output:\n  max_colors: 1\n",
        "output:\n  max_colors: 300\n",
        "style:\n  temperature:\n    interval: 0\n",
        "style:\n  temperature:\n    min: 10\n    max: -10\n",
        "style:\n  temperature:\n    colormap: rainbow\n",
        "style:\n  height_contours:\n    interval: -6\n",
        "style:\n  barbs:\n    stride: 0\n",
        "selection:\n  step_hours: 0\n",
        "selection:\n  frames: 0\n",
        "thumbnails:\n  small: 0\n",
        "colorbar:\n  height: 0\n",
        "labels:\n  format: \"%Y-%Q\"\n",
    ];
    for yaml in cases {
        assert!(BuildConfig::from_yaml(yaml).is_err(), "accepted invalid config:\n{}", yaml);
    }
}

#[test]
fn test_unparseable_color_is_rejected() {
    assert!(BuildConfig::from_yaml("style:\n  background: not-a-color\n").is_err());
}

#[test]
fn test_non_ascii_color_is_an_error() {
    assert!(BuildConfig::from_yaml("style:\n  background: \"#a\u{e9}\u{20ac}\"\n").is_err());
}

#[test]
fn test_missing_config_file() {
    let err = BuildConfig::load("/nonexistent/sos.yaml").unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to read config"));
}
