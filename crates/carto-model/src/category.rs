//! The fixed catalog of feature categories fetched from the feature service.

use crate::{GeometryKind, ModelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one of the six fixed feature categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKey {
    /// Bus stops, bus stations and railway stations.
    Transit,
    /// Mountain peaks.
    Peaks,
    /// Road network.
    Roads,
    /// Streams.
    Waterways,
    /// Lakes and reservoirs.
    Lakes,
    /// Residential land use.
    Landuse,
}

impl CategoryKey {
    /// Lowercase identifier used in file names and on the command line.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CategoryKey::Transit => "transit",
            CategoryKey::Peaks => "peaks",
            CategoryKey::Roads => "roads",
            CategoryKey::Waterways => "waterways",
            CategoryKey::Lakes => "lakes",
            CategoryKey::Landuse => "landuse",
        }
    }

    /// Position in [`FEATURE_CATEGORIES`].
    pub const fn index(&self) -> usize {
        match self {
            CategoryKey::Transit => 0,
            CategoryKey::Peaks => 1,
            CategoryKey::Roads => 2,
            CategoryKey::Waterways => 3,
            CategoryKey::Lakes => 4,
            CategoryKey::Landuse => 5,
        }
    }

    /// The catalog entry for this key.
    pub fn config(&self) -> &'static FeatureCategoryConfig {
        &FEATURE_CATEGORIES[self.index()]
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CategoryKey {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        FEATURE_CATEGORIES
            .iter()
            .map(|c| c.key)
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ModelError::UnknownCategory(s.to_string()))
    }
}

/// Static description of one feature category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureCategoryConfig {
    /// Category identifier.
    pub key: CategoryKey,
    /// OSM tag key the filter is built on (e.g. `highway`).
    pub tag: &'static str,
    /// Accepted tag values, OR-ed together in the query.
    pub values: &'static [&'static str],
    /// Human-readable name.
    pub display_name: &'static str,
    /// Registry layer name and output file stem.
    pub layer_name: &'static str,
    /// Geometry kind of the produced layer.
    pub geometry_kind: GeometryKind,
}

impl FeatureCategoryConfig {
    /// Whether a tag value belongs to this category.
    pub fn accepts(&self, value: &str) -> bool {
        self.values.contains(&value)
    }
}

/// The six categories, in acquisition order.
pub const FEATURE_CATEGORIES: [FeatureCategoryConfig; 6] = [
    FeatureCategoryConfig {
        key: CategoryKey::Transit,
        tag: "highway",
        values: &["bus_stop", "bus_station", "railway_station"],
        display_name: "Transit stops & cableways",
        layer_name: "transit",
        geometry_kind: GeometryKind::Point,
    },
    FeatureCategoryConfig {
        key: CategoryKey::Peaks,
        tag: "natural",
        values: &["peak"],
        display_name: "Peaks",
        layer_name: "peaks",
        geometry_kind: GeometryKind::Point,
    },
    FeatureCategoryConfig {
        key: CategoryKey::Roads,
        tag: "highway",
        values: &[
            "footway",
            "path",
            "pedestrian",
            "primary",
            "residential",
            "secondary",
            "service",
            "steps",
            "tertiary",
            "track",
            "unclassified",
        ],
        display_name: "Roads",
        layer_name: "roads",
        geometry_kind: GeometryKind::Line,
    },
    FeatureCategoryConfig {
        key: CategoryKey::Waterways,
        tag: "waterway",
        values: &["stream"],
        display_name: "Rivers",
        layer_name: "waterways",
        geometry_kind: GeometryKind::Line,
    },
    FeatureCategoryConfig {
        key: CategoryKey::Lakes,
        tag: "natural",
        values: &["water", "reservoir"],
        display_name: "Lakes",
        layer_name: "lakes",
        geometry_kind: GeometryKind::Polygon,
    },
    FeatureCategoryConfig {
        key: CategoryKey::Landuse,
        tag: "landuse",
        values: &["residential"],
        display_name: "Land use",
        layer_name: "landuse",
        geometry_kind: GeometryKind::Polygon,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_six_unique_categories() {
        let mut keys: Vec<_> = FEATURE_CATEGORIES.iter().map(|c| c.key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 6);

        let mut names: Vec<_> = FEATURE_CATEGORIES.iter().map(|c| c.layer_name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 6);
    }

    #[test]
    fn test_config_lookup_matches_key() {
        for cat in &FEATURE_CATEGORIES {
            assert_eq!(cat.key.config().key, cat.key);
        }
        assert_eq!(CategoryKey::Lakes.config().geometry_kind, GeometryKind::Polygon);
        assert_eq!(CategoryKey::Waterways.config().tag, "waterway");
    }

    #[test]
    fn test_parse_category_key() {
        assert_eq!("Roads".parse::<CategoryKey>().unwrap(), CategoryKey::Roads);
        assert!("rivers".parse::<CategoryKey>().is_err());
    }

    #[test]
    fn test_accepts() {
        let roads = CategoryKey::Roads.config();
        assert!(roads.accepts("primary"));
        assert!(!roads.accepts("bus_stop"));
    }
}
