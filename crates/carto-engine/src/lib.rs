//! # carto-engine
//!
//! The boundary between Cartoflow and the geospatial processing engine.
//!
//! Raster clipping, warping, hillshade, color relief, contour tracing and
//! vector reprojection are not implemented here. They are described as typed
//! requests, validated, and handed to a [`ProcessingEngine`]. The production
//! engine is [`GdalCliEngine`], which drives the GDAL utilities; tests use
//! their own implementation of the trait.
//!
//! ## Example
//!
//! ```no_run
//! use carto_engine::{submit, GdalCliEngine, HillshadeRequest};
//!
//! let engine = GdalCliEngine::new();
//! let shade = submit(
//!     &engine,
//!     &HillshadeRequest {
//!         source: "output/dem.tif".into(),
//!         output: "output/shade.tif".into(),
//!         z_factor: 1.0,
//!         azimuth: 315.0,
//!         altitude: 35.0,
//!     },
//! )?;
//! println!("Wrote {}", shade.display());
//! # Ok::<(), carto_engine::EngineError>(())
//! ```

mod error;
mod gdal;
mod info;
mod request;

pub use error::EngineError;
pub use gdal::GdalCliEngine;
pub use info::RasterInfo;
pub use request::{
    submit, ClipRequest, ColorReliefRequest, ContourRequest, EngineRequest, HillshadeRequest,
    ProbeRequest, ReliefStop, Resampling, TransformBoundsRequest, VectorReprojectRequest,
    WarpRequest,
};

use carto_model::BoundingBox;
use std::path::PathBuf;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Geospatial operations the pipeline delegates.
///
/// Implementations may assume the request has passed
/// [`EngineRequest::validate`]; use [`submit`] rather than calling these
/// directly. Raster and vector operations return the path they wrote.
pub trait ProcessingEngine: Send + Sync {
    /// Open a raster and report its metadata.
    fn probe_raster(&self, req: &ProbeRequest) -> Result<RasterInfo>;

    /// Cut a raster to a window or polygon mask.
    fn clip_raster(&self, req: &ClipRequest) -> Result<PathBuf>;

    /// Reproject a raster.
    fn warp_raster(&self, req: &WarpRequest) -> Result<PathBuf>;

    /// Shaded relief.
    fn hillshade(&self, req: &HillshadeRequest) -> Result<PathBuf>;

    /// Color-table rendering.
    fn color_relief(&self, req: &ColorReliefRequest) -> Result<PathBuf>;

    /// Contour lines.
    fn contours(&self, req: &ContourRequest) -> Result<PathBuf>;

    /// Reproject a vector file.
    fn reproject_vector(&self, req: &VectorReprojectRequest) -> Result<PathBuf>;

    /// Transform a bounding box between references.
    fn transform_bounds(&self, req: &TransformBoundsRequest) -> Result<BoundingBox>;
}
