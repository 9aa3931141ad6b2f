//! Fetching one category from the feature service, with a placeholder
//! layer when that fails.

use crate::convert::convert;
use crate::geojson::write_features;
use crate::osm::OsmDocument;
use crate::query::build_query;
use crate::{AcquisitionError, HttpClient, Result};
use carto_model::{
    feature_schema, BoundingBox, Crs, FeatureCategoryConfig, Layer, LayerRole, OverpassConfig,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of acquiring one category. Both variants carry a layer of the
/// category's geometry kind and attribute schema, so downstream stages
/// always find all six.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Features were fetched and converted.
    Fetched(Layer),
    /// The service or the conversion failed; an empty layer stands in.
    Unavailable {
        /// What went wrong.
        reason: AcquisitionError,
        /// Empty layer with the expected schema.
        placeholder: Layer,
    },
}

impl FetchOutcome {
    /// The layer to register.
    pub fn layer(&self) -> &Layer {
        match self {
            FetchOutcome::Fetched(layer) => layer,
            FetchOutcome::Unavailable { placeholder, .. } => placeholder,
        }
    }

    /// Consume into the layer to register.
    pub fn into_layer(self) -> Layer {
        match self {
            FetchOutcome::Fetched(layer) => layer,
            FetchOutcome::Unavailable { placeholder, .. } => placeholder,
        }
    }

    /// Whether real data was fetched.
    pub fn is_fetched(&self) -> bool {
        matches!(self, FetchOutcome::Fetched(_))
    }
}

fn category_layer(category: &FeatureCategoryConfig, path: PathBuf) -> Layer {
    Layer::vector(
        category.layer_name,
        LayerRole::Feature {
            category: category.key,
        },
        category.geometry_kind,
        Crs::wgs84(),
        path,
        feature_schema(),
    )
}

/// GeoJSON path for a category inside `out_dir`.
pub fn category_path(category: &FeatureCategoryConfig, out_dir: &Path) -> PathBuf {
    out_dir.join(format!("{}.geojson", category.layer_name))
}

/// Empty layer of the category's geometry kind and schema, in EPSG:4326.
///
/// An empty FeatureCollection is written so the layer has a backing file;
/// if even that fails the layer is still returned.
pub fn placeholder_layer(category: &FeatureCategoryConfig, out_dir: &Path) -> Layer {
    let path = category_path(category, out_dir);
    if let Err(e) = write_features(&path, &[]) {
        warn!(layer = category.layer_name, error = %e, "Could not write placeholder file");
    }
    category_layer(category, path).with_feature_count(0)
}

/// Fetches categories from an Overpass endpoint.
pub struct FeatureAcquirer<'a> {
    client: &'a dyn HttpClient,
    endpoint: String,
    timeout_secs: u64,
}

impl<'a> FeatureAcquirer<'a> {
    /// Acquirer posting to the configured endpoint through `client`.
    pub fn new(client: &'a dyn HttpClient, config: &OverpassConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            timeout_secs: config.timeout_secs,
        }
    }

    /// Fetch, convert and write one category. `bbox` is in EPSG:4326.
    ///
    /// Never fails: any error yields [`FetchOutcome::Unavailable`].
    pub fn fetch(&self, category: &FeatureCategoryConfig, bbox: &BoundingBox, out_dir: &Path) -> FetchOutcome {
        match self.try_fetch(category, bbox, out_dir) {
            Ok(layer) => {
                info!(
                    layer = category.layer_name,
                    features = layer.feature_count.unwrap_or(0),
                    "Fetched features"
                );
                FetchOutcome::Fetched(layer)
            }
            Err(reason) => {
                warn!(
                    layer = category.layer_name,
                    error = %reason,
                    "Fetch failed, using an empty placeholder layer"
                );
                FetchOutcome::Unavailable {
                    reason,
                    placeholder: placeholder_layer(category, out_dir),
                }
            }
        }
    }

    fn try_fetch(&self, category: &FeatureCategoryConfig, bbox: &BoundingBox, out_dir: &Path) -> Result<Layer> {
        let query = build_query(category, bbox, self.timeout_secs);
        debug!(layer = category.layer_name, %query, "Overpass query");
        let payload = self.client.post_text(&self.endpoint, &query)?;

        std::fs::create_dir_all(out_dir)?;
        let raw_path = out_dir.join(format!("{}.osm", category.layer_name));
        std::fs::write(&raw_path, &payload)?;
        let converted = Self::convert_payload(category, &payload, out_dir);
        if let Err(e) = std::fs::remove_file(&raw_path) {
            warn!(path = %raw_path.display(), error = %e, "Could not remove raw OSM payload");
        }
        converted
    }

    fn convert_payload(category: &FeatureCategoryConfig, payload: &str, out_dir: &Path) -> Result<Layer> {
        let doc = OsmDocument::parse(payload)?;
        let features = convert(&doc, category);
        let path = category_path(category, out_dir);
        let count = write_features(&path, &features)?;
        Ok(category_layer(category, path).with_feature_count(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geojson::count_features;
    use carto_model::{CategoryKey, GeometryKind, LayerKind};
    use std::sync::Mutex;

    struct CannedClient {
        response: std::result::Result<String, u16>,
        queries: Mutex<Vec<String>>,
    }

    impl CannedClient {
        fn ok(body: &str) -> Self {
            Self {
                response: Ok(body.to_string()),
                queries: Mutex::new(Vec::new()),
            }
        }

        fn status(code: u16) -> Self {
            Self {
                response: Err(code),
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    impl HttpClient for CannedClient {
        fn post_text(&self, url: &str, body: &str) -> Result<String> {
            self.queries.lock().unwrap().push(body.to_string());
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(code) => Err(AcquisitionError::HttpStatus {
                    status: *code,
                    url: url.to_string(),
                }),
            }
        }
    }

    fn bbox() -> BoundingBox {
        BoundingBox::new(115.9, 29.5, 116.05, 29.6).unwrap()
    }

    #[test]
    fn test_fetched_layer() {
        let dir = tempfile::tempdir().unwrap();
        let client = CannedClient::ok(
            r#"<osm><node id="7" lat="29.55" lon="115.99"><tag k="natural" v="peak"/><tag k="name" v="Hanyang"/></node></osm>"#,
        );
        let acquirer = FeatureAcquirer::new(&client, &OverpassConfig::default());
        let outcome = acquirer.fetch(CategoryKey::Peaks.config(), &bbox(), dir.path());

        assert!(outcome.is_fetched());
        let layer = outcome.into_layer();
        assert_eq!(layer.name, "peaks");
        assert_eq!(layer.kind, LayerKind::Vector(GeometryKind::Point));
        assert_eq!(layer.crs, Crs::wgs84());
        assert_eq!(layer.feature_count, Some(1));
        assert_eq!(count_features(&layer.path).unwrap(), 1);
        assert!(!dir.path().join("peaks.osm").exists());

        let queries = client.queries.lock().unwrap();
        assert!(queries[0].contains("(29.5,115.9,29.6,116.05)"));
    }

    #[test]
    fn test_http_error_yields_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let client = CannedClient::status(504);
        let acquirer = FeatureAcquirer::new(&client, &OverpassConfig::default());
        let outcome = acquirer.fetch(CategoryKey::Lakes.config(), &bbox(), dir.path());

        match &outcome {
            FetchOutcome::Unavailable { reason, placeholder } => {
                assert!(reason.is_network());
                assert_eq!(placeholder.kind, LayerKind::Vector(GeometryKind::Polygon));
                assert_eq!(placeholder.feature_count, Some(0));
                assert_eq!(placeholder.fields, feature_schema());
                assert_eq!(placeholder.crs, Crs::wgs84());
            }
            FetchOutcome::Fetched(_) => panic!("expected placeholder"),
        }
        assert_eq!(count_features(&outcome.layer().path).unwrap(), 0);
    }

    #[test]
    fn test_malformed_payload_yields_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let client = CannedClient::ok("<html>Too Many Requests</html>");
        let acquirer = FeatureAcquirer::new(&client, &OverpassConfig::default());
        let outcome = acquirer.fetch(CategoryKey::Roads.config(), &bbox(), dir.path());

        match outcome {
            FetchOutcome::Unavailable { reason, placeholder } => {
                assert!(!reason.is_network());
                assert_eq!(placeholder.kind, LayerKind::Vector(GeometryKind::Line));
            }
            FetchOutcome::Fetched(_) => panic!("expected placeholder"),
        }
        assert!(!dir.path().join("roads.osm").exists());
    }
}
