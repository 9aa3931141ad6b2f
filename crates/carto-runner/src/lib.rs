//! # carto-runner
//!
//! Drives the Cartoflow workflow: extent definition, the elevation
//! pipeline, feature acquisition, reprojection and styling.
//!
//! Each operation is a method on [`Pipeline`] taking the
//! [`LayerRegistry`](carto_model::LayerRegistry) explicitly. Operations
//! report progress over a channel ([`progress_channel`]), check a
//! [`CancelToken`] before every stage, and are normally run on a
//! background thread via [`spawn_worker`].
//!
//! ## Example
//!
//! ```no_run
//! use carto_runner::{progress_channel, spawn_worker, ExtentSource, Pipeline};
//! use carto_engine::GdalCliEngine;
//! use carto_features::ReqwestClient;
//! use carto_model::{BoundingBox, CartoConfig, LayerRegistry};
//! use std::sync::Arc;
//!
//! let config = CartoConfig::default();
//! let http = ReqwestClient::from_config(&config.overpass).expect("HTTP client");
//! let (reporter, events) = progress_channel();
//! let mut pipeline = Pipeline::new(config.clone(), Arc::new(GdalCliEngine::new()), Arc::new(http))
//!     .with_progress(reporter);
//!
//! let worker = spawn_worker(move || {
//!     let mut registry = LayerRegistry::new();
//!     let extent = ExtentSource::Rect {
//!         bbox: BoundingBox::new(400_000.0, 3_260_000.0, 410_000.0, 3_270_000.0).expect("bounds"),
//!         crs: config.target_crs.clone(),
//!     };
//!     let result = pipeline.run_all(&mut registry, Some(extent));
//!     pipeline.finish(result.is_ok(), "done");
//!     result
//! })?;
//!
//! for event in events.iter() {
//!     println!("{:?}", event);
//! }
//! worker.join()??;
//! # Ok::<(), carto_runner::PipelineError>(())
//! ```

mod acquisition;
mod cancel;
mod elevation;
mod error;
mod pipeline;
mod progress;
mod reproject;
mod run;
mod styling;
mod worker;

pub use acquisition::STAGE_FEATURES;
pub use cancel::CancelToken;
pub use elevation::{
    CLIPPED_DEM_LAYER, DEM_LAYER, DEM_RENDER_LAYER, HILLSHADE_LAYER, STAGE_CLIP, STAGE_HILLSHADE,
    STAGE_RENDER, STAGE_REPROJECT,
};
pub use error::PipelineError;
pub use pipeline::{ExtentSource, Pipeline, RunSummary, STAGE_EXTENT};
pub use progress::{progress_channel, ProgressEvent, ProgressReporter};
pub use reproject::STAGE_REPROJECT_LAYERS;
pub use run::{
    AcquisitionReport, CategoryOutcome, ElevationReport, PipelineRun, ReprojectReport, StageOutcome,
};
pub use styling::STAGE_STYLE;
pub use worker::{spawn_worker, WorkerHandle};

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
