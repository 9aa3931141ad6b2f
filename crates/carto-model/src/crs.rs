//! Spatial reference identifiers and axis-aligned bounds.

use crate::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authority identifier for WGS 84 geographic coordinates.
pub const WGS84: &str = "EPSG:4326";

/// A coordinate reference system identified by an authority code.
///
/// Two references are equal when their normalized identifiers are equal.
/// No geometry is ever compared; this is what makes the reprojection pass
/// idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Crs(String);

impl Crs {
    /// Parse an authority string such as `EPSG:32650` or `epsg:4326`.
    pub fn new(id: &str) -> Result<Self> {
        let trimmed = id.trim();
        let (authority, code) = trimmed
            .split_once(':')
            .ok_or_else(|| ModelError::InvalidCrs(id.to_string()))?;

        if authority.is_empty()
            || !authority.chars().all(|c| c.is_ascii_alphanumeric())
            || code.is_empty()
            || !code.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ModelError::InvalidCrs(id.to_string()));
        }

        Ok(Self(format!("{}:{}", authority.to_ascii_uppercase(), code)))
    }

    /// Wrap an identifier already in normalized `AUTHORITY:CODE` form.
    pub(crate) fn from_normalized(id: &str) -> Self {
        Self(id.to_string())
    }

    /// WGS 84 longitude/latitude.
    pub fn wgs84() -> Self {
        Self(WGS84.to_string())
    }

    /// The normalized identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric EPSG code, if this is an EPSG reference.
    pub fn epsg_code(&self) -> Option<u32> {
        self.0.strip_prefix("EPSG:").and_then(|c| c.parse().ok())
    }

    /// Whether coordinates in this reference are longitude/latitude degrees.
    pub fn is_geographic(&self) -> bool {
        matches!(self.epsg_code(), Some(4326) | Some(4490) | Some(4258) | Some(4269))
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Crs {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self> {
        Crs::new(&value)
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.0
    }
}

impl std::str::FromStr for Crs {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Crs::new(s)
    }
}

/// Axis-aligned bounding box in the units of some [`Crs`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum X (west edge, or minimum longitude).
    pub min_x: f64,
    /// Minimum Y (south edge, or minimum latitude).
    pub min_y: f64,
    /// Maximum X (east edge, or maximum longitude).
    pub max_x: f64,
    /// Maximum Y (north edge, or maximum latitude).
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a validated bounding box.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self> {
        let bbox = Self {
            min_x,
            min_y,
            max_x,
            max_y,
        };
        if bbox.is_valid() {
            Ok(bbox)
        } else {
            Err(ModelError::InvalidBounds {
                min_x,
                min_y,
                max_x,
                max_y,
            })
        }
    }

    /// Smallest box containing all points. `None` for an empty iterator.
    pub fn from_points<I: IntoIterator<Item = (f64, f64)>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let (x, y) = iter.next()?;
        let mut bbox = Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        };
        for (x, y) in iter {
            bbox.min_x = bbox.min_x.min(x);
            bbox.min_y = bbox.min_y.min(y);
            bbox.max_x = bbox.max_x.max(x);
            bbox.max_y = bbox.max_y.max(y);
        }
        Some(bbox)
    }

    /// Parse `minx,miny,maxx,maxy`.
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| ModelError::Config(format!("invalid bbox '{}': {}", s, e)))?;

        match parts.as_slice() {
            [min_x, min_y, max_x, max_y] => Self::new(*min_x, *min_y, *max_x, *max_y),
            _ => Err(ModelError::Config(format!(
                "bbox '{}' must have exactly four comma-separated values",
                s
            ))),
        }
    }

    /// Finite with positive width and height.
    pub fn is_valid(&self) -> bool {
        [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite())
            && self.min_x < self.max_x
            && self.min_y < self.max_y
    }

    /// Width in CRS units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height in CRS units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Whether a point is within the box (edges inclusive).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Whether `other` lies entirely inside this box.
    pub fn contains_bbox(&self, other: &BoundingBox) -> bool {
        self.contains(other.min_x, other.min_y) && self.contains(other.max_x, other.max_y)
    }

    /// The four corners, counter-clockwise from the south-west.
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.min_x, self.min_y),
            (self.max_x, self.min_y),
            (self.max_x, self.max_y),
            (self.min_x, self.max_y),
        ]
    }
}
