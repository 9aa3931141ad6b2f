//! # carto-features
//!
//! Vector feature acquisition from an Overpass endpoint.
//!
//! For each of the six fixed categories an Overpass QL query is built over
//! the extent's bounds, POSTed to the service, parsed from OSM XML and
//! written as a GeoJSON layer in EPSG:4326. A category whose fetch fails in
//! any way is replaced by an empty placeholder layer with the same geometry
//! kind and attribute schema, so the rest of the run proceeds unchanged.
//!
//! ## Example
//!
//! ```no_run
//! use carto_features::{FeatureAcquirer, ReqwestClient};
//! use carto_model::{BoundingBox, OverpassConfig, FEATURE_CATEGORIES};
//!
//! let config = OverpassConfig::default();
//! let client = ReqwestClient::from_config(&config)?;
//! let acquirer = FeatureAcquirer::new(&client, &config);
//! let bbox = BoundingBox::new(115.9, 29.5, 116.05, 29.6).expect("valid bounds");
//!
//! for category in &FEATURE_CATEGORIES {
//!     let outcome = acquirer.fetch(category, &bbox, "output".as_ref());
//!     println!("{}: fetched = {}", category.layer_name, outcome.is_fetched());
//! }
//! # Ok::<(), carto_features::AcquisitionError>(())
//! ```

mod acquire;
mod convert;
mod error;
mod geojson;
mod http;
mod osm;
mod query;

pub use acquire::{category_path, placeholder_layer, FeatureAcquirer, FetchOutcome};
pub use convert::{convert, Feature, Geometry};
pub use error::AcquisitionError;
pub use geojson::{count_features, feature_collection, write_features};
pub use http::{HttpClient, ReqwestClient};
pub use osm::{OsmDocument, OsmMember, OsmNode, OsmRelation, OsmWay};
pub use query::build_query;

/// Result type for acquisition operations.
pub type Result<T> = std::result::Result<T, AcquisitionError>;
