//! The region of interest bounding a run.

use crate::{
    BoundingBox, Crs, Field, FieldType, GeometryKind, Layer, LayerRegistry, LayerRole, ModelError,
    Result,
};
use serde_json::{json, Value};
use std::path::Path;
use tracing::{debug, info};

/// Registry name of the extent layer.
pub const MAP_EXTENT_LAYER: &str = "map_extent";

/// File the extent polygon is written to inside the output directory.
pub const MAP_EXTENT_FILE: &str = "extent.geojson";

/// A single closed polygon with a known spatial reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Extent {
    ring: Vec<(f64, f64)>,
    bbox: BoundingBox,
    crs: Crs,
}

impl Extent {
    /// Build from a rectangle.
    pub fn from_rect(bbox: BoundingBox, crs: Crs) -> Result<Self> {
        if !bbox.is_valid() {
            return Err(ModelError::InvalidBounds {
                min_x: bbox.min_x,
                min_y: bbox.min_y,
                max_x: bbox.max_x,
                max_y: bbox.max_y,
            });
        }
        Self::from_ring(bbox.corners().to_vec(), crs)
    }

    /// Build from the bounds of a raster, i.e. the full coverage of the source.
    pub fn from_raster_bounds(bounds: BoundingBox, crs: Crs) -> Result<Self> {
        Self::from_rect(bounds, crs)
    }

    /// Build from drawn polygons. The first polygon is used.
    pub fn from_polygons(polygons: Vec<Vec<(f64, f64)>>, crs: Crs) -> Result<Self> {
        let count = polygons.len();
        let ring = polygons.into_iter().next().ok_or(ModelError::EmptyExtent)?;
        if count > 1 {
            debug!(count, "Several extent polygons drawn, using the first");
        }
        Self::from_ring(ring, crs)
    }

    /// Parse GeoJSON (FeatureCollection, Feature or bare geometry) and use
    /// the outer ring of the first polygon found.
    pub fn from_geojson_str(geojson: &str, crs: Crs) -> Result<Self> {
        let value: Value = serde_json::from_str(geojson)?;
        let mut rings = Vec::new();
        collect_outer_rings(&value, &mut rings)?;
        Self::from_polygons(rings, crs)
    }

    /// Read a GeoJSON file of drawn features.
    pub fn from_geojson_file(path: &Path, crs: Crs) -> Result<Self> {
        let geojson = std::fs::read_to_string(path)?;
        Self::from_geojson_str(&geojson, crs)
    }

    fn from_ring(mut ring: Vec<(f64, f64)>, crs: Crs) -> Result<Self> {
        if ring.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(ModelError::InvalidExtent(
                "vertex coordinates must be finite".to_string(),
            ));
        }
        if ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }

        let mut distinct: Vec<(f64, f64)> = Vec::with_capacity(ring.len());
        for p in &ring {
            if !distinct.contains(p) {
                distinct.push(*p);
            }
        }
        if distinct.len() < 3 {
            return Err(ModelError::InvalidExtent(format!(
                "{} distinct vertices, need at least 3",
                distinct.len()
            )));
        }

        let bbox = BoundingBox::from_points(distinct.iter().copied())
            .ok_or(ModelError::EmptyExtent)?;
        ring.push(ring[0]);
        let extent = Self { ring, bbox, crs };
        if extent.area() <= 0.0 {
            return Err(ModelError::InvalidExtent("polygon has zero area".to_string()));
        }
        Ok(extent)
    }

    /// The closed ring; first and last vertex are equal.
    pub fn ring(&self) -> &[(f64, f64)] {
        &self.ring
    }

    /// Spatial reference of the ring.
    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    /// Bounding box of the ring.
    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// Unsigned area in CRS units squared (shoelace formula).
    pub fn area(&self) -> f64 {
        let twice: f64 = self
            .ring
            .windows(2)
            .map(|w| w[0].0 * w[1].1 - w[1].0 * w[0].1)
            .sum();
        (twice / 2.0).abs()
    }

    /// GeoJSON FeatureCollection holding the extent as one polygon feature.
    ///
    /// Non-WGS84 references are recorded in the legacy `crs` member so that
    /// GDAL picks them up when the file is used as a cutline.
    pub fn to_geojson(&self) -> Value {
        let coords: Vec<[f64; 2]> = self.ring.iter().map(|&(x, y)| [x, y]).collect();
        let mut collection = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "name": MAP_EXTENT_LAYER },
                "geometry": { "type": "Polygon", "coordinates": [coords] }
            }]
        });
        if let Some(code) = self.crs.epsg_code().filter(|&c| c != 4326) {
            collection["crs"] = json!({
                "type": "name",
                "properties": { "name": format!("urn:ogc:def:crs:EPSG::{}", code) }
            });
        }
        collection
    }

    /// Write `extent.geojson` into `out_dir` and register the `map_extent`
    /// layer, replacing any earlier extent.
    pub fn register(&self, registry: &mut LayerRegistry, out_dir: &Path) -> Result<Layer> {
        std::fs::create_dir_all(out_dir)?;
        let path = out_dir.join(MAP_EXTENT_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(&self.to_geojson())?)?;

        let layer = Layer::vector(
            MAP_EXTENT_LAYER,
            LayerRole::MapExtent,
            GeometryKind::Polygon,
            self.crs.clone(),
            path,
            vec![Field::new("name", FieldType::String)],
        )
        .with_feature_count(1);
        registry.upsert(layer.clone());

        let bbox = self.bbox();
        info!(
            crs = %self.crs,
            min_x = bbox.min_x,
            min_y = bbox.min_y,
            max_x = bbox.max_x,
            max_y = bbox.max_y,
            "Map extent defined"
        );
        Ok(layer)
    }
}

fn collect_outer_rings(value: &Value, rings: &mut Vec<Vec<(f64, f64)>>) -> Result<()> {
    match value.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {
            if let Some(features) = value.get("features").and_then(Value::as_array) {
                for feature in features {
                    collect_outer_rings(feature, rings)?;
                }
            }
        }
        Some("Feature") => {
            if let Some(geometry) = value.get("geometry").filter(|g| !g.is_null()) {
                collect_outer_rings(geometry, rings)?;
            }
        }
        Some("Polygon") => {
            if let Some(outer) = value
                .get("coordinates")
                .and_then(Value::as_array)
                .and_then(|r| r.first())
            {
                rings.push(parse_ring(outer)?);
            }
        }
        Some("MultiPolygon") => {
            if let Some(polygons) = value.get("coordinates").and_then(Value::as_array) {
                for polygon in polygons {
                    if let Some(outer) = polygon.as_array().and_then(|r| r.first()) {
                        rings.push(parse_ring(outer)?);
                    }
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn parse_ring(value: &Value) -> Result<Vec<(f64, f64)>> {
    let positions = value
        .as_array()
        .ok_or_else(|| ModelError::InvalidExtent("ring is not an array".to_string()))?;
    positions
        .iter()
        .map(|p| {
            let x = p.get(0).and_then(Value::as_f64);
            let y = p.get(1).and_then(Value::as_f64);
            match (x, y) {
                (Some(x), Some(y)) => Ok((x, y)),
                _ => Err(ModelError::InvalidExtent(format!("bad position {}", p))),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn utm() -> Crs {
        Crs::new("EPSG:32650").unwrap()
    }

    #[test]
    fn test_from_rect_closes_ring() {
        let bbox = BoundingBox::new(400_000.0, 3_260_000.0, 410_000.0, 3_270_000.0).unwrap();
        let extent = Extent::from_rect(bbox, utm()).unwrap();
        assert_eq!(extent.ring().len(), 5);
        assert_eq!(extent.ring().first(), extent.ring().last());
        assert_eq!(extent.bbox(), bbox);
        assert_relative_eq!(extent.area(), 1.0e8);
    }

    #[test]
    fn test_no_polygons_is_empty_extent() {
        let err = Extent::from_polygons(Vec::new(), utm()).unwrap_err();
        assert!(matches!(err, ModelError::EmptyExtent));
    }

    #[test]
    fn test_degenerate_polygons_rejected() {
        let two_points = vec![vec![(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)]];
        assert!(matches!(
            Extent::from_polygons(two_points, utm()),
            Err(ModelError::InvalidExtent(_))
        ));

        let collinear = vec![vec![(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]];
        assert!(matches!(
            Extent::from_polygons(collinear, utm()),
            Err(ModelError::InvalidExtent(_))
        ));
    }

    #[test]
    fn test_first_of_several_polygons_used() {
        let polygons = vec![
            vec![(0.0, 0.0), (4.0, 0.0), (4.0, 3.0)],
            vec![(10.0, 10.0), (20.0, 10.0), (20.0, 20.0)],
        ];
        let extent = Extent::from_polygons(polygons, utm()).unwrap();
        assert_relative_eq!(extent.area(), 6.0);
        assert_eq!(extent.bbox().max_x, 4.0);
    }

    #[test]
    fn test_from_geojson_feature_collection() {
        let geojson = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {}, "geometry": null},
                {"type": "Feature", "properties": {"id": 1}, "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[115.9, 29.5], [116.05, 29.5], [116.05, 29.6], [115.9, 29.6], [115.9, 29.5]]]
                }}
            ]
        }"#;
        let extent = Extent::from_geojson_str(geojson, Crs::wgs84()).unwrap();
        let bbox = extent.bbox();
        assert_eq!(bbox.min_x, 115.9);
        assert_eq!(bbox.max_y, 29.6);
    }

    #[test]
    fn test_geojson_without_polygons_is_empty() {
        let geojson = r#"{"type": "FeatureCollection", "features": []}"#;
        assert!(matches!(
            Extent::from_geojson_str(geojson, utm()),
            Err(ModelError::EmptyExtent)
        ));
    }

    #[test]
    fn test_register_writes_file_and_layer() {
        let dir = tempfile::tempdir().unwrap();
        let bbox = BoundingBox::new(0.0, 0.0, 100.0, 50.0).unwrap();
        let extent = Extent::from_rect(bbox, utm()).unwrap();

        let mut registry = LayerRegistry::new();
        let layer = extent.register(&mut registry, dir.path()).unwrap();
        assert_eq!(layer.name, MAP_EXTENT_LAYER);
        assert!(dir.path().join(MAP_EXTENT_FILE).exists());

        let stored = registry.find_by_name(MAP_EXTENT_LAYER).unwrap();
        assert_eq!(stored.role, LayerRole::MapExtent);
        assert_eq!(stored.crs, utm());

        let reread = Extent::from_geojson_file(&stored.path, stored.crs.clone()).unwrap();
        assert_eq!(reread, extent);

        // Registering again replaces rather than duplicates.
        extent.register(&mut registry, dir.path()).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_geojson_carries_crs_member() {
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let projected = Extent::from_rect(bbox, utm()).unwrap().to_geojson();
        assert_eq!(
            projected["crs"]["properties"]["name"],
            "urn:ogc:def:crs:EPSG::32650"
        );
        let geographic = Extent::from_rect(bbox, Crs::wgs84()).unwrap().to_geojson();
        assert!(geographic.get("crs").is_none());
    }
}
