//! OSM XML as returned by the Overpass API.

use crate::{AcquisitionError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{BTreeMap, HashMap};

/// A node: a tagged point or a vertex referenced by ways.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OsmNode {
    /// Longitude.
    pub lon: f64,
    /// Latitude.
    pub lat: f64,
    /// Tags.
    pub tags: HashMap<String, String>,
}

/// An ordered list of node references.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OsmWay {
    /// Node ids in order.
    pub nodes: Vec<i64>,
    /// Tags.
    pub tags: HashMap<String, String>,
}

/// Member of a relation.
#[derive(Debug, Clone, PartialEq)]
pub struct OsmMember {
    /// `node`, `way` or `relation`.
    pub kind: String,
    /// Referenced id.
    pub id: i64,
    /// Role within the relation, e.g. `outer`.
    pub role: String,
}

/// A relation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OsmRelation {
    /// Members in order.
    pub members: Vec<OsmMember>,
    /// Tags.
    pub tags: HashMap<String, String>,
}

/// Parsed document, keyed by element id.
///
/// Overpass may list an element twice (once with tags from `out body`, once
/// bare from `out skel`); the tagged copy is kept.
#[derive(Debug, Clone, Default)]
pub struct OsmDocument {
    /// Nodes by id.
    pub nodes: BTreeMap<i64, OsmNode>,
    /// Ways by id.
    pub ways: BTreeMap<i64, OsmWay>,
    /// Relations by id.
    pub relations: BTreeMap<i64, OsmRelation>,
}

enum Element {
    Node(i64, OsmNode),
    Way(i64, OsmWay),
    Relation(i64, OsmRelation),
}

impl Element {
    fn tags_mut(&mut self) -> &mut HashMap<String, String> {
        match self {
            Element::Node(_, n) => &mut n.tags,
            Element::Way(_, w) => &mut w.tags,
            Element::Relation(_, r) => &mut r.tags,
        }
    }
}

fn attributes(e: &BytesStart<'_>) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| AcquisitionError::Conversion(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        map.insert(key, value);
    }
    Ok(map)
}

fn required<T: std::str::FromStr>(
    attrs: &HashMap<String, String>,
    element: &str,
    name: &str,
) -> Result<T> {
    attrs
        .get(name)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| AcquisitionError::Conversion(format!("<{}> without valid '{}'", element, name)))
}

impl OsmDocument {
    /// Parse an OSM XML payload.
    ///
    /// A `<remark>` reporting a runtime error (Overpass's way of signalling
    /// a timeout or memory exhaustion with status 200) is returned as
    /// [`AcquisitionError::Service`].
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut doc = OsmDocument::default();
        let mut buf = Vec::new();
        let mut current: Option<Element> = None;
        let mut in_remark = false;
        let mut saw_root = false;

        loop {
            let event = reader.read_event_into(&mut buf)?;
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    let name = e.name();
                    match name.as_ref() {
                        b"osm" => saw_root = true,
                        b"remark" => in_remark = !is_empty,
                        b"node" | b"way" | b"relation" => {
                            let attrs = attributes(e)?;
                            let element = match name.as_ref() {
                                b"node" => {
                                    let id = required(&attrs, "node", "id")?;
                                    Element::Node(
                                        id,
                                        OsmNode {
                                            lon: required(&attrs, "node", "lon")?,
                                            lat: required(&attrs, "node", "lat")?,
                                            tags: HashMap::new(),
                                        },
                                    )
                                }
                                b"way" => Element::Way(required(&attrs, "way", "id")?, OsmWay::default()),
                                _ => Element::Relation(
                                    required(&attrs, "relation", "id")?,
                                    OsmRelation::default(),
                                ),
                            };
                            if is_empty {
                                doc.insert(element);
                            } else {
                                current = Some(element);
                            }
                        }
                        b"tag" => {
                            if let Some(element) = current.as_mut() {
                                let attrs = attributes(e)?;
                                if let (Some(k), Some(v)) = (attrs.get("k"), attrs.get("v")) {
                                    element.tags_mut().insert(k.clone(), v.clone());
                                }
                            }
                        }
                        b"nd" => {
                            if let Some(Element::Way(_, way)) = current.as_mut() {
                                way.nodes.push(required(&attributes(e)?, "nd", "ref")?);
                            }
                        }
                        b"member" => {
                            if let Some(Element::Relation(_, relation)) = current.as_mut() {
                                let attrs = attributes(e)?;
                                relation.members.push(OsmMember {
                                    kind: attrs.get("type").cloned().unwrap_or_default(),
                                    id: required(&attrs, "member", "ref")?,
                                    role: attrs.get("role").cloned().unwrap_or_default(),
                                });
                            }
                        }
                        _ => {}
                    }
                }
                Event::Text(ref t) if in_remark => {
                    let remark = t.unescape()?.into_owned();
                    if remark.to_ascii_lowercase().contains("error") {
                        return Err(AcquisitionError::Service(remark));
                    }
                }
                Event::End(ref e) => match e.name().as_ref() {
                    b"node" | b"way" | b"relation" => {
                        if let Some(element) = current.take() {
                            doc.insert(element);
                        }
                    }
                    b"remark" => in_remark = false,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !saw_root {
            return Err(AcquisitionError::Conversion(
                "payload has no <osm> root element".to_string(),
            ));
        }
        Ok(doc)
    }

    fn insert(&mut self, element: Element) {
        match element {
            Element::Node(id, node) => {
                let slot = self.nodes.entry(id).or_default();
                if slot.tags.is_empty() {
                    *slot = node;
                }
            }
            Element::Way(id, way) => {
                let slot = self.ways.entry(id).or_default();
                if slot.tags.is_empty() {
                    *slot = way;
                }
            }
            Element::Relation(id, relation) => {
                let slot = self.relations.entry(id).or_default();
                if slot.tags.is_empty() {
                    *slot = relation;
                }
            }
        }
    }

    /// Coordinates of a way's nodes; `None` if any node is missing.
    pub fn way_coordinates(&self, way: &OsmWay) -> Option<Vec<(f64, f64)>> {
        way.nodes
            .iter()
            .map(|id| self.nodes.get(id).map(|n| (n.lon, n.lat)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="Overpass API">
  <note>The data included in this document is from www.openstreetmap.org.</note>
  <node id="1" lat="29.55" lon="115.95">
    <tag k="natural" v="peak"/>
    <tag k="name" v="Hanpo &amp; Peak"/>
  </node>
  <way id="10">
    <nd ref="2"/>
    <nd ref="3"/>
    <tag k="highway" v="primary"/>
  </way>
  <relation id="100">
    <member type="way" ref="10" role="outer"/>
    <tag k="type" v="multipolygon"/>
  </relation>
  <node id="2" lat="29.5" lon="115.9"/>
  <node id="3" lat="29.6" lon="116.0"/>
  <node id="1" lat="29.55" lon="115.95"/>
</osm>"#;

    #[test]
    fn test_parse_sample() {
        let doc = OsmDocument::parse(SAMPLE).unwrap();
        assert_eq!(doc.nodes.len(), 3);
        let peak = &doc.nodes[&1];
        assert_eq!(peak.tags["name"], "Hanpo & Peak");
        assert_eq!(peak.tags["natural"], "peak");

        let way = &doc.ways[&10];
        assert_eq!(way.nodes, vec![2, 3]);
        assert_eq!(way.tags["highway"], "primary");
        assert_eq!(
            doc.way_coordinates(way).unwrap(),
            vec![(115.9, 29.5), (116.0, 29.6)]
        );

        let relation = &doc.relations[&100];
        assert_eq!(relation.members[0].role, "outer");
        assert_eq!(relation.members[0].kind, "way");
        assert_eq!(relation.tags["type"], "multipolygon");
    }

    #[test]
    fn test_runtime_error_remark() {
        let xml = r#"<osm><remark> runtime error: Query timed out in "query" at line 3 after 181 seconds. </remark></osm>"#;
        assert!(matches!(
            OsmDocument::parse(xml),
            Err(AcquisitionError::Service(_))
        ));
    }

    #[test]
    fn test_not_osm() {
        assert!(OsmDocument::parse("<html><body>busy</body></html>").is_err());
        assert!(OsmDocument::parse("").is_err());
    }

    #[test]
    fn test_missing_node_breaks_way() {
        let xml = r#"<osm><way id="5"><nd ref="7"/><nd ref="8"/></way><node id="7" lat="1" lon="2"/></osm>"#;
        let doc = OsmDocument::parse(xml).unwrap();
        assert!(doc.way_coordinates(&doc.ways[&5]).is_none());
    }
}
