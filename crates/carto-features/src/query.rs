//! Overpass QL construction.

use carto_model::{BoundingBox, FeatureCategoryConfig};

/// Overpass QL fetching every node, way and relation whose `tag` matches one
/// of the category's values inside `bbox` (EPSG:4326), plus the nodes and
/// ways those reference.
///
/// The values are joined into an anchored regex alternation, which is how
/// Overpass expresses an OR over tag values.
pub fn build_query(category: &FeatureCategoryConfig, bbox: &BoundingBox, timeout_secs: u64) -> String {
    let filter = tag_filter(category);
    // Overpass bounding boxes are (south, west, north, east).
    let area = format!(
        "({},{},{},{})",
        bbox.min_y, bbox.min_x, bbox.max_y, bbox.max_x
    );

    format!(
        "[out:xml][timeout:{timeout}];\n\
         (\n  \
           node{filter}{area};\n  \
           way{filter}{area};\n  \
           relation{filter}{area};\n\
         );\n\
         out body;\n\
         >;\n\
         out skel qt;\n",
        timeout = timeout_secs,
        filter = filter,
        area = area
    )
}

fn tag_filter(category: &FeatureCategoryConfig) -> String {
    let alternation = category
        .values
        .iter()
        .map(|v| escape(v))
        .collect::<Vec<_>>()
        .join("|");
    format!("[\"{}\"~\"^({})$\"]", escape(category.tag), alternation)
}

/// Escape characters that are special inside an Overpass string literal or
/// regular expression.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '.' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '^' | '$' => {
                out.push_str("\\\\");
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}
