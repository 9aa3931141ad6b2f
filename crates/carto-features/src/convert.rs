//! Turning OSM elements into features of a single geometry kind.

use crate::osm::{OsmDocument, OsmRelation};
use carto_model::{FeatureCategoryConfig, GeometryKind};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::debug;

type Ring = Vec<(f64, f64)>;

/// Feature geometry in longitude/latitude.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// A single position.
    Point((f64, f64)),
    /// An open or closed line.
    LineString(Vec<(f64, f64)>),
    /// Outer ring followed by holes.
    Polygon(Vec<Ring>),
    /// Several polygons.
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Geometry {
    /// GeoJSON geometry object.
    pub fn to_geojson(&self) -> Value {
        fn positions(points: &[(f64, f64)]) -> Vec<[f64; 2]> {
            points.iter().map(|&(x, y)| [x, y]).collect()
        }
        match self {
            Geometry::Point((x, y)) => json!({ "type": "Point", "coordinates": [x, y] }),
            Geometry::LineString(line) => {
                json!({ "type": "LineString", "coordinates": positions(line) })
            }
            Geometry::Polygon(rings) => json!({
                "type": "Polygon",
                "coordinates": rings.iter().map(|r| positions(r)).collect::<Vec<_>>()
            }),
            Geometry::MultiPolygon(polygons) => json!({
                "type": "MultiPolygon",
                "coordinates": polygons
                    .iter()
                    .map(|p| p.iter().map(|r| positions(r)).collect::<Vec<_>>())
                    .collect::<Vec<_>>()
            }),
        }
    }
}

/// One converted feature with the shared attribute schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// OSM element id.
    pub osm_id: String,
    /// Matched tag value.
    pub fclass: String,
    /// `name` tag, if any.
    pub name: Option<String>,
    /// Geometry.
    pub geometry: Geometry,
}

impl Feature {
    /// GeoJSON Feature object.
    pub fn to_geojson(&self) -> Value {
        json!({
            "type": "Feature",
            "properties": {
                "osm_id": self.osm_id,
                "fclass": self.fclass,
                "name": self.name,
            },
            "geometry": self.geometry.to_geojson(),
        })
    }
}

fn matched_value(category: &FeatureCategoryConfig, tags: &HashMap<String, String>) -> Option<String> {
    tags.get(category.tag)
        .filter(|v| category.accepts(v))
        .cloned()
}

fn make_feature(
    category: &FeatureCategoryConfig,
    id: i64,
    tags: &HashMap<String, String>,
    geometry: Geometry,
) -> Option<Feature> {
    Some(Feature {
        osm_id: id.to_string(),
        fclass: matched_value(category, tags)?,
        name: tags.get("name").cloned(),
        geometry,
    })
}

/// Extract the features of `category` from `doc`.
///
/// Elements whose tag value is not one of the category's values are
/// dropped, as are ways that reference nodes missing from the payload.
pub fn convert(doc: &OsmDocument, category: &FeatureCategoryConfig) -> Vec<Feature> {
    let features: Vec<Feature> = match category.geometry_kind {
        GeometryKind::Point => doc
            .nodes
            .iter()
            .filter_map(|(&id, node)| {
                make_feature(category, id, &node.tags, Geometry::Point((node.lon, node.lat)))
            })
            .collect(),
        GeometryKind::Line => doc
            .ways
            .iter()
            .filter_map(|(&id, way)| {
                matched_value(category, &way.tags)?;
                let coords = doc.way_coordinates(way).filter(|c| c.len() >= 2)?;
                make_feature(category, id, &way.tags, Geometry::LineString(coords))
            })
            .collect(),
        GeometryKind::Polygon => {
            let mut features: Vec<Feature> = doc
                .ways
                .iter()
                .filter_map(|(&id, way)| {
                    matched_value(category, &way.tags)?;
                    let closed = way.nodes.len() >= 4 && way.nodes.first() == way.nodes.last();
                    if !closed {
                        return None;
                    }
                    let ring = doc.way_coordinates(way)?;
                    make_feature(category, id, &way.tags, Geometry::Polygon(vec![ring]))
                })
                .collect();
            features.extend(doc.relations.iter().filter_map(|(&id, relation)| {
                matched_value(category, &relation.tags)?;
                if relation.tags.get("type").map(String::as_str) != Some("multipolygon") {
                    return None;
                }
                let geometry = multipolygon_geometry(doc, relation)?;
                make_feature(category, id, &relation.tags, geometry)
            }));
            features
        }
    };

    debug!(
        category = %category.key,
        nodes = doc.nodes.len(),
        ways = doc.ways.len(),
        relations = doc.relations.len(),
        features = features.len(),
        "Converted OSM payload"
    );
    features
}

fn multipolygon_geometry(doc: &OsmDocument, relation: &OsmRelation) -> Option<Geometry> {
    let member_ways = |role: &str| -> Vec<Vec<i64>> {
        relation
            .members
            .iter()
            .filter(|m| m.kind == "way" && (m.role == role || (role == "outer" && m.role.is_empty())))
            .filter_map(|m| doc.ways.get(&m.id))
            .map(|w| w.nodes.clone())
            .collect()
    };

    let to_coords = |ring: Vec<i64>| -> Option<Ring> {
        ring.iter()
            .map(|id| doc.nodes.get(id).map(|n| (n.lon, n.lat)))
            .collect()
    };

    let outers: Vec<Ring> = stitch_rings(member_ways("outer"))
        .into_iter()
        .filter_map(to_coords)
        .collect();
    if outers.is_empty() {
        return None;
    }
    let inners: Vec<Ring> = stitch_rings(member_ways("inner"))
        .into_iter()
        .filter_map(to_coords)
        .collect();

    let mut polygons: Vec<Vec<Ring>> = outers.into_iter().map(|outer| vec![outer]).collect();
    for inner in inners {
        let probe = inner[0];
        match polygons.iter_mut().find(|p| point_in_ring(probe, &p[0])) {
            Some(polygon) => polygon.push(inner),
            None => debug!("Dropping inner ring outside every outer ring"),
        }
    }

    if polygons.len() == 1 {
        polygons.pop().map(Geometry::Polygon)
    } else {
        Some(Geometry::MultiPolygon(polygons))
    }
}

/// Join way node sequences end to end into closed rings.
///
/// Segments that cannot be closed are discarded.
pub(crate) fn stitch_rings(segments: Vec<Vec<i64>>) -> Vec<Vec<i64>> {
    let mut remaining: Vec<Vec<i64>> = segments.into_iter().filter(|s| s.len() >= 2).collect();
    let mut rings = Vec::new();

    while let Some(mut current) = remaining.pop() {
        loop {
            if current.len() >= 4 && current.first() == current.last() {
                rings.push(current);
                break;
            }
            let Some(&end) = current.last() else { break };
            let next = remaining
                .iter()
                .position(|s| s.first() == Some(&end) || s.last() == Some(&end));
            match next {
                Some(idx) => {
                    let mut segment = remaining.swap_remove(idx);
                    if segment.first() != Some(&end) {
                        segment.reverse();
                    }
                    current.extend(segment.into_iter().skip(1));
                }
                None => {
                    debug!(nodes = current.len(), "Discarding unclosed ring");
                    break;
                }
            }
        }
    }
    rings
}

/// Even-odd ray casting.
fn point_in_ring(point: (f64, f64), ring: &[(f64, f64)]) -> bool {
    let (x, y) = point;
    let mut inside = false;
    for w in ring.windows(2) {
        let ((x1, y1), (x2, y2)) = (w[0], w[1]);
        if (y1 > y) != (y2 > y) && x < (x2 - x1) * (y - y1) / (y2 - y1) + x1 {
            inside = !inside;
        }
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use carto_model::CategoryKey;

    fn doc(xml: &str) -> OsmDocument {
        OsmDocument::parse(xml).unwrap()
    }

    #[test]
    fn test_points_filtered_by_value() {
        let d = doc(r#"<osm>
            <node id="1" lat="29.5" lon="115.9"><tag k="highway" v="bus_stop"/><tag k="name" v="Guling"/></node>
            <node id="2" lat="29.5" lon="115.9"><tag k="highway" v="crossing"/></node>
            <node id="3" lat="29.5" lon="115.9"/>
        </osm>"#);
        let features = convert(&d, CategoryKey::Transit.config());
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].osm_id, "1");
        assert_eq!(features[0].fclass, "bus_stop");
        assert_eq!(features[0].name.as_deref(), Some("Guling"));
    }

    #[test]
    fn test_lines_need_resolved_nodes() {
        let d = doc(r#"<osm>
            <way id="10"><nd ref="1"/><nd ref="2"/><tag k="waterway" v="stream"/></way>
            <way id="11"><nd ref="1"/><nd ref="9"/><tag k="waterway" v="stream"/></way>
            <way id="12"><nd ref="1"/><nd ref="2"/><tag k="waterway" v="river"/></way>
            <node id="1" lat="29.5" lon="115.9"/>
            <node id="2" lat="29.6" lon="116.0"/>
        </osm>"#);
        let features = convert(&d, CategoryKey::Waterways.config());
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].osm_id, "10");
        assert_eq!(
            features[0].geometry,
            Geometry::LineString(vec![(115.9, 29.5), (116.0, 29.6)])
        );
    }

    #[test]
    fn test_closed_way_polygon() {
        let d = doc(r#"<osm>
            <way id="20"><nd ref="1"/><nd ref="2"/><nd ref="3"/><nd ref="1"/><tag k="natural" v="water"/></way>
            <way id="21"><nd ref="1"/><nd ref="2"/><nd ref="3"/><tag k="natural" v="water"/></way>
            <node id="1" lat="0" lon="0"/>
            <node id="2" lat="0" lon="1"/>
            <node id="3" lat="1" lon="1"/>
        </osm>"#);
        let features = convert(&d, CategoryKey::Lakes.config());
        assert_eq!(features.len(), 1);
        match &features[0].geometry {
            Geometry::Polygon(rings) => assert_eq!(rings[0].len(), 4),
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_multipolygon_relation_with_hole() {
        // Outer square split over two ways, inner square as one closed way.
        let d = doc(r#"<osm>
            <relation id="100">
              <member type="way" ref="1" role="outer"/>
              <member type="way" ref="2" role="outer"/>
              <member type="way" ref="3" role="inner"/>
              <tag k="type" v="multipolygon"/>
              <tag k="natural" v="reservoir"/>
              <tag k="name" v="Lulin Lake"/>
            </relation>
            <way id="1"><nd ref="1"/><nd ref="2"/><nd ref="3"/></way>
            <way id="2"><nd ref="1"/><nd ref="4"/><nd ref="3"/></way>
            <way id="3"><nd ref="5"/><nd ref="6"/><nd ref="7"/><nd ref="8"/><nd ref="5"/></way>
            <node id="1" lat="0" lon="0"/>
            <node id="2" lat="0" lon="10"/>
            <node id="3" lat="10" lon="10"/>
            <node id="4" lat="10" lon="0"/>
            <node id="5" lat="4" lon="4"/>
            <node id="6" lat="4" lon="6"/>
            <node id="7" lat="6" lon="6"/>
            <node id="8" lat="6" lon="4"/>
        </osm>"#);
        let features = convert(&d, CategoryKey::Lakes.config());
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].osm_id, "100");
        assert_eq!(features[0].fclass, "reservoir");
        match &features[0].geometry {
            Geometry::Polygon(rings) => {
                assert_eq!(rings.len(), 2);
                assert_eq!(rings[0].len(), 5);
                assert_eq!(rings[0].first(), rings[0].last());
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_stitch_discards_open_chains() {
        let rings = stitch_rings(vec![vec![1, 2], vec![3, 2], vec![3, 1], vec![7, 8]]);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].len(), 4);
        assert_eq!(rings[0].first(), rings[0].last());
    }

    #[test]
    fn test_point_in_ring() {
        let square = vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 0.0)];
        assert!(point_in_ring((1.0, 1.0), &square));
        assert!(!point_in_ring((3.0, 1.0), &square));
    }

    #[test]
    fn test_feature_geojson_properties() {
        let feature = Feature {
            osm_id: "42".to_string(),
            fclass: "peak".to_string(),
            name: None,
            geometry: Geometry::Point((115.98, 29.53)),
        };
        let value = feature.to_geojson();
        assert_eq!(value["properties"]["osm_id"], "42");
        assert!(value["properties"]["name"].is_null());
        assert_eq!(value["geometry"]["type"], "Point");
    }
}
