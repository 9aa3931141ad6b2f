//! GeoJSON output for feature layers.

use crate::convert::Feature;
use crate::Result;
use serde_json::{json, Value};
use std::path::Path;

/// FeatureCollection of `features`.
pub fn feature_collection(features: &[Feature]) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": features.iter().map(Feature::to_geojson).collect::<Vec<_>>(),
    })
}

/// Write `features` to `path` and return how many were written.
pub fn write_features(path: &Path, features: &[Feature]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string(&feature_collection(features))?)?;
    Ok(features.len())
}

/// Number of features in a GeoJSON file.
pub fn count_features(path: &Path) -> Result<usize> {
    let value: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    Ok(value
        .get("features")
        .and_then(Value::as_array)
        .map_or(0, Vec::len))
}
