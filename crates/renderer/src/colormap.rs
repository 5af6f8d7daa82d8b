//! Colors, color ramps and banded color schemes for filled contours.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::contour::generate_contour_levels;
use crate::error::{RenderError, RenderResult};

/// Color value in RGBA format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim_start_matches('#');
        if !digits.is_ascii() {
            return None;
        }
        match digits.len() {
            6 => hex_to_rgb(digits).map(|(r, g, b)| Color::rgb(r, g, b)),
            8 => {
                let (r, g, b) = hex_to_rgb(&digits[..6])?;
                let a = u8::from_str_radix(&digits[6..8], 16).ok()?;
                Some(Color::new(r, g, b, a))
            }
            _ => None,
        }
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }

    /// Solid anti-aliased paint of this color.
    pub fn paint(self) -> tiny_skia::Paint<'static> {
        let mut paint = tiny_skia::Paint::default();
        paint.set_color_rgba8(self.r, self.g, self.b, self.a);
        paint.anti_alias = true;
        paint
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl FromStr for Color {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::from_hex(s.trim()).ok_or_else(|| RenderError::InvalidScale(format!("invalid color '{}'", s)))
    }
}

impl TryFrom<String> for Color {
    type Error = RenderError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

/// Parse a hex color string (e.g., "#FF0000") to RGB values.
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some((r, g, b))
}

/// Linear color interpolation, `t` clamped to `[0, 1]`.
pub fn interpolate_color(color1: Color, color2: Color, t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    let t_inv = 1.0 - t;
    let mix = |a: u8, b: u8| (a as f32 * t_inv + b as f32 * t).round() as u8;

    Color::new(
        mix(color1.r, color2.r),
        mix(color1.g, color2.g),
        mix(color1.b, color2.b),
        mix(color1.a, color2.a),
    )
}

/// One stop of a [`ColorRamp`], `position` in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub position: f32,
    pub color: Color,
}

/// Piecewise-linear color ramp over `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRamp {
    stops: Vec<ColorStop>,
}

impl ColorRamp {
    pub fn new(mut stops: Vec<ColorStop>) -> RenderResult<Self> {
        if stops.len() < 2 {
            return Err(RenderError::InvalidScale(
                "a color ramp needs at least two stops".to_string(),
            ));
        }
        if stops.iter().any(|s| !(0.0..=1.0).contains(&s.position)) {
            return Err(RenderError::InvalidScale(
                "color stop positions must be within [0, 1]".to_string(),
            ));
        }
        stops.sort_by(|a, b| a.position.total_cmp(&b.position));
        Ok(Self { stops })
    }

    fn from_table(table: &[(f32, Color)]) -> Self {
        Self {
            stops: table
                .iter()
                .map(|&(position, color)| ColorStop { position, color })
                .collect(),
        }
    }

    /// Blue through cyan, green and yellow to dark red, matching the
    /// -50..50 °C weather temperature scale.
    pub fn temperature() -> Self {
        Self::from_table(&[
            (0.0, Color::rgb(25, 0, 76)),
            (0.2, Color::rgb(0, 0, 255)),
            (0.5, Color::rgb(0, 255, 255)),
            (0.6, Color::rgb(0, 255, 0)),
            (0.7, Color::rgb(255, 255, 0)),
            (0.8, Color::rgb(255, 165, 0)),
            (0.9, Color::rgb(255, 0, 0)),
            (1.0, Color::rgb(139, 0, 0)),
        ])
    }

    /// Diverging blue-white-red.
    pub fn coolwarm() -> Self {
        Self::from_table(&[
            (0.0, Color::rgb(59, 76, 192)),
            (0.25, Color::rgb(141, 176, 254)),
            (0.5, Color::rgb(221, 220, 220)),
            (0.75, Color::rgb(244, 154, 123)),
            (1.0, Color::rgb(180, 4, 38)),
        ])
    }

    pub fn viridis() -> Self {
        Self::from_table(&[
            (0.0, Color::rgb(0x44, 0x01, 0x54)),
            (0.25, Color::rgb(0x3b, 0x52, 0x8b)),
            (0.5, Color::rgb(0x21, 0x91, 0x8c)),
            (0.75, Color::rgb(0x5e, 0xc9, 0x62)),
            (1.0, Color::rgb(0xfd, 0xe7, 0x25)),
        ])
    }

    /// Look up a built-in ramp by name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "temperature" => Some(Self::temperature()),
            "coolwarm" => Some(Self::coolwarm()),
            "viridis" => Some(Self::viridis()),
            _ => None,
        }
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    /// Color at position `t`, clamped to the ramp ends.
    pub fn at(&self, t: f32) -> Color {
        let first = self.stops[0];
        if t.is_nan() || t <= first.position {
            return first.color;
        }
        for pair in self.stops.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if t <= hi.position {
                let span = hi.position - lo.position;
                if span <= f32::EPSILON {
                    return hi.color;
                }
                return interpolate_color(lo.color, hi.color, (t - lo.position) / span);
            }
        }
        self.stops[self.stops.len() - 1].color
    }
}

/// Discrete color bands between contour levels.
///
/// `levels` holds the `n + 1` band edges. There are `n` inner bands plus one
/// open band below the first level and one above the last, so `colors` has
/// `n + 2` entries.
#[derive(Debug, Clone, PartialEq)]
pub struct BandScheme {
    levels: Vec<f32>,
    colors: Vec<Color>,
}

impl BandScheme {
    /// Bands at explicit edges, colored by sampling `ramp` evenly.
    pub fn new(levels: Vec<f32>, ramp: &ColorRamp) -> RenderResult<Self> {
        if levels.len() < 2 {
            return Err(RenderError::InvalidScale(
                "at least two band levels are required".to_string(),
            ));
        }
        if levels.windows(2).any(|w| w[1] <= w[0] || w[0].is_nan()) {
            return Err(RenderError::InvalidScale(
                "band levels must be strictly increasing".to_string(),
            ));
        }

        let count = levels.len() + 1;
        let colors = (0..count)
            .map(|k| ramp.at(k as f32 / (count - 1) as f32))
            .collect();
        Ok(Self { levels, colors })
    }

    /// Bands every `interval` from `min` to `max` inclusive.
    pub fn from_range(min: f32, max: f32, interval: f32, ramp: &ColorRamp) -> RenderResult<Self> {
        if !(interval > 0.0) {
            return Err(RenderError::InvalidScale(format!(
                "band interval must be positive, got {}",
                interval
            )));
        }
        Self::new(generate_contour_levels(min, max, interval), ramp)
    }

    pub fn levels(&self) -> &[f32] {
        &self.levels
    }

    /// Colors from the lower open band to the upper open band.
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Index into [`colors`](Self::colors) for a value, `None` for `NaN`.
    pub fn band_index(&self, value: f32) -> Option<usize> {
        if value.is_nan() {
            return None;
        }
        // Number of edges at or below the value
        Some(self.levels.partition_point(|&edge| edge <= value))
    }

    pub fn color_for(&self, value: f32) -> Option<Color> {
        self.band_index(value).map(|i| self.colors[i])
    }

    pub fn below_color(&self) -> Color {
        self.colors[0]
    }

    pub fn above_color(&self) -> Color {
        self.colors[self.colors.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_to_rgb() {
        assert_eq!(hex_to_rgb("#FF0000"), Some((255, 0, 0)));
        assert_eq!(hex_to_rgb("00ff80"), Some((0, 255, 128)));
        assert_eq!(hex_to_rgb("#FFF"), None);
        assert_eq!(hex_to_rgb("#GG0000"), None);
    }

    #[test]
    fn test_color_hex_roundtrip() {
        let c: Color = "#1a2b3c".parse().unwrap();
        assert_eq!(c, Color::rgb(0x1a, 0x2b, 0x3c));
        assert_eq!(c.to_string(), "#1a2b3c");

        let c: Color = "#ffffff80".parse().unwrap();
        assert_eq!(c.a, 0x80);
        assert_eq!(c.to_string(), "#ffffff80");

        assert!("red".parse::<Color>().is_err());
    }

    #[test]
    fn test_non_ascii_hex_is_rejected() {
        // Six and eight bytes long, but not six or eight hex digits
        assert_eq!(hex_to_rgb("#a\u{e9}\u{20ac}"), None);
        assert_eq!(Color::from_hex("#a\u{e9}\u{20ac}"), None);
        assert_eq!(Color::from_hex("#\u{20ac}\u{20ac}ab"), None);
        assert!("#a\u{e9}\u{20ac}".parse::<Color>().is_err());
    }

    #[test]
    fn test_interpolate_color_midpoint() {
        let c = interpolate_color(Color::rgb(0, 0, 0), Color::rgb(200, 100, 50), 0.5);
        assert_eq!(c, Color::rgb(100, 50, 25));
        let c = interpolate_color(Color::BLACK, Color::WHITE, 4.0);
        assert_eq!(c, Color::WHITE);
    }

    #[test]
    fn test_ramp_ends_and_clamping() {
        let ramp = ColorRamp::temperature();
        assert_eq!(ramp.at(0.0), Color::rgb(25, 0, 76));
        assert_eq!(ramp.at(1.0), Color::rgb(139, 0, 0));
        assert_eq!(ramp.at(-1.0), Color::rgb(25, 0, 76));
        assert_eq!(ramp.at(2.0), Color::rgb(139, 0, 0));
        // 0.5 sits on the cyan stop
        assert_eq!(ramp.at(0.5), Color::rgb(0, 255, 255));
    }

    #[test]
    fn test_ramp_by_name() {
        assert!(ColorRamp::by_name("Viridis").is_some());
        assert!(ColorRamp::by_name("coolwarm").is_some());
        assert!(ColorRamp::by_name("jet").is_none());
    }

    #[test]
    fn test_ramp_requires_two_stops() {
        let one = vec![ColorStop {
            position: 0.0,
            color: Color::BLACK,
        }];
        assert!(ColorRamp::new(one).is_err());
    }

    #[test]
    fn test_band_index_extends_both_ends() {
        let scheme = BandScheme::new(vec![-10.0, 0.0, 10.0], &ColorRamp::viridis()).unwrap();
        assert_eq!(scheme.colors().len(), 4);
        assert_eq!(scheme.band_index(-50.0), Some(0));
        assert_eq!(scheme.band_index(-10.0), Some(1));
        assert_eq!(scheme.band_index(-0.5), Some(1));
        assert_eq!(scheme.band_index(0.0), Some(2));
        assert_eq!(scheme.band_index(10.0), Some(3));
        assert_eq!(scheme.band_index(99.0), Some(3));
        assert_eq!(scheme.band_index(f32::NAN), None);
        assert_eq!(scheme.below_color(), ColorRamp::viridis().at(0.0));
        assert_eq!(scheme.above_color(), ColorRamp::viridis().at(1.0));
    }

    #[test]
    fn test_band_scheme_from_range() {
        let scheme = BandScheme::from_range(-40.0, 40.0, 4.0, &ColorRamp::coolwarm()).unwrap();
        assert_eq!(scheme.levels().len(), 21);
        assert_eq!(scheme.levels()[0], -40.0);
        assert_eq!(scheme.levels()[20], 40.0);
        assert!(BandScheme::from_range(0.0, 10.0, 0.0, &ColorRamp::coolwarm()).is_err());
    }

    #[test]
    fn test_band_levels_must_increase() {
        assert!(BandScheme::new(vec![0.0, 0.0, 1.0], &ColorRamp::viridis()).is_err());
        assert!(BandScheme::new(vec![1.0], &ColorRamp::viridis()).is_err());
    }
}
