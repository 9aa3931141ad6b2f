//! Rendering vocabulary attached to layers by the styling pass.
//!
//! These types only describe a style. The rule tables that decide which
//! style a layer gets live in `carto-style`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    /// Opaque red.
    pub const RED: Color = Color::rgb(255, 0, 0);

    /// Build from channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    /// Lowercase `#rrggbb`.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Linear interpolation between two colors, `t` clamped to [0, 1].
    pub fn lerp(&self, other: &Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Color::rgb(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::from_hex(&value).ok_or_else(|| format!("invalid color '{}'", value))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// Marker shape for point symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerShape {
    /// Circle.
    Circle,
    /// Square.
    Square,
    /// Upward triangle.
    Triangle,
}

/// Stroke pattern for line symbols and polygon outlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    /// Continuous stroke.
    #[default]
    Solid,
    /// Dashed stroke.
    Dash,
}

/// A single rendering instruction. Sizes and widths are in millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Symbol {
    /// Point marker.
    Marker {
        /// Shape.
        shape: MarkerShape,
        /// Size in mm.
        size_mm: f64,
        /// Fill color.
        color: Color,
    },
    /// Line stroke.
    Line {
        /// Stroke color.
        color: Color,
        /// Stroke width in mm.
        width_mm: f64,
        /// Stroke pattern.
        #[serde(default)]
        style: LineStyle,
    },
    /// Polygon fill with outline. `fill: None` means transparent.
    Fill {
        /// Fill color.
        fill: Option<Color>,
        /// Outline color.
        outline: Color,
        /// Outline width in mm.
        outline_width_mm: f64,
        /// Outline pattern.
        #[serde(default)]
        outline_style: LineStyle,
    },
}

impl Symbol {
    /// The geometry kind this symbol can be drawn on.
    pub fn geometry_kind(&self) -> crate::GeometryKind {
        match self {
            Symbol::Marker { .. } => crate::GeometryKind::Point,
            Symbol::Line { .. } => crate::GeometryKind::Line,
            Symbol::Fill { .. } => crate::GeometryKind::Polygon,
        }
    }
}

/// One category of a categorized renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleCategory {
    /// Attribute value matched by this category.
    pub value: String,
    /// Legend text.
    pub legend: String,
    /// Symbol drawn for matching features.
    pub symbol: Symbol,
}

/// Color ramp interpolation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RampInterpolation {
    /// Colors blend linearly between stops.
    #[default]
    Interpolated,
    /// Each stop's color holds until the next stop.
    Discrete,
}

/// A color ramp stop anchored at an absolute raster value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    /// Raster value.
    pub value: f64,
    /// Color at that value.
    pub color: Color,
    /// Legend label (the stop's percentage of the observed range).
    pub label_percent: u8,
}

/// How a layer is drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "renderer", rename_all = "snake_case")]
pub enum Symbology {
    /// Every feature drawn with one symbol.
    Single {
        /// The symbol.
        symbol: Symbol,
    },
    /// Features drawn by the value of one attribute.
    Categorized {
        /// Attribute name.
        field: String,
        /// Categories in legend order.
        categories: Vec<StyleCategory>,
    },
    /// Single-band pseudo-color raster rendering.
    PseudoColor {
        /// Ramp stops in ascending value order.
        stops: Vec<ColorStop>,
        /// Interpolation mode.
        interpolation: RampInterpolation,
    },
    /// Hillshade raster rendering.
    Hillshade {
        /// Light azimuth in degrees.
        azimuth: f64,
        /// Light altitude in degrees.
        altitude: f64,
        /// Vertical exaggeration.
        z_factor: f64,
    },
}

/// Label placement relative to the feature geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelPlacement {
    /// Placed around the point or polygon centroid.
    #[default]
    AroundPoint,
    /// Parallel to the line.
    Line,
    /// Parallel to the line, centered on it.
    OnLine,
}

/// Halo drawn around label text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextBuffer {
    /// Buffer size in mm.
    pub size_mm: f64,
    /// Buffer color.
    pub color: Color,
}

/// Labeling instructions for a vector layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRule {
    /// Attribute providing the text.
    pub field: String,
    /// Font family.
    pub font: String,
    /// Font size in points.
    pub size_pt: f64,
    /// Text color.
    pub color: Color,
    /// Placement mode.
    #[serde(default)]
    pub placement: LabelPlacement,
    /// Optional halo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer: Option<TextBuffer>,
}

/// The complete visible style of a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerStyle {
    /// Symbology.
    pub symbology: Symbology,
    /// Labeling, if enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<LabelRule>,
    /// Layer opacity in percent (0-100).
    pub opacity_percent: u8,
}
