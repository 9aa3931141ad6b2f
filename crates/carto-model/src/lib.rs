//! # carto-model
//!
//! Core data model for the Cartoflow map production workflow.
//!
//! This crate holds everything the pipeline stages pass between each other:
//! - [`Crs`] and [`BoundingBox`] - spatial reference and axis-aligned bounds
//! - [`Extent`] - the single region of interest bounding a run
//! - [`FeatureCategoryConfig`] - the fixed catalog of feature categories
//! - [`Layer`] and [`LayerRegistry`] - produced artifacts and the project that owns them
//! - [`style`] - the rendering vocabulary assigned to layers by the styling pass
//! - [`CartoConfig`] - run configuration with all domain defaults
//!
//! ## Example
//!
//! ```no_run
//! use carto_model::{BoundingBox, Crs, Extent, LayerRegistry};
//!
//! let crs = Crs::new("EPSG:32650")?;
//! let extent = Extent::from_rect(BoundingBox::new(400_000.0, 3_260_000.0, 410_000.0, 3_270_000.0)?, crs)?;
//!
//! let mut registry = LayerRegistry::new();
//! extent.register(&mut registry, std::path::Path::new("out"))?;
//! assert!(registry.find_by_name(carto_model::MAP_EXTENT_LAYER).is_some());
//! # Ok::<(), carto_model::ModelError>(())
//! ```

mod category;
mod config;
mod crs;
mod error;
mod extent;
mod layer;
pub mod style;

pub use category::{CategoryKey, FeatureCategoryConfig, FEATURE_CATEGORIES};
pub use config::{
    CartoConfig, ClipMode, ContourConfig, DemRenderConfig, EngineConfig, HillshadeConfig,
    OverpassConfig, RampStop, DEFAULT_OVERPASS_ENDPOINT, DEFAULT_OVERPASS_TIMEOUT_SECS, DEFAULT_TARGET_CRS,
};
pub use crs::{BoundingBox, Crs, WGS84};
pub use error::ModelError;
pub use extent::{Extent, MAP_EXTENT_FILE, MAP_EXTENT_LAYER};
pub use layer::{
    feature_schema, Field, FieldType, GeometryKind, Layer, LayerKind, LayerRegistry, LayerRole,
    PROJECT_FILE,
};

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
