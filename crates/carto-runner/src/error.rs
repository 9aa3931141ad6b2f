//! Error types for pipeline operations.

use carto_engine::EngineError;
use carto_model::ModelError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a top-level pipeline operation.
///
/// Per-stage failures inside an operation (a contour product, one feature
/// category, one layer's reprojection) are not errors at this level; they
/// are recorded in the operation's report.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A prerequisite is absent: no extent, no DEM, no drawn polygon.
    #[error("Missing input: {0}")]
    InputMissing(String),

    /// The extent geometry is degenerate.
    #[error("Invalid extent: {0}")]
    InvalidExtent(String),

    /// The source raster could not be opened.
    #[error("Cannot read source {path}: {reason}")]
    SourceUnreadable {
        /// Source path.
        path: PathBuf,
        /// Underlying failure.
        reason: String,
    },

    /// Cancellation was requested before the named stage.
    #[error("Cancelled before stage '{0}'")]
    Cancelled(String),

    /// The background worker panicked.
    #[error("Worker thread panicked")]
    WorkerPanicked,

    /// Model or configuration error.
    #[error("Model error: {0}")]
    Model(ModelError),

    /// Engine error outside the per-stage failure policy.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ModelError> for PipelineError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::EmptyExtent => {
                PipelineError::InputMissing("no extent polygon was drawn".to_string())
            }
            ModelError::InvalidExtent(reason) => PipelineError::InvalidExtent(reason),
            other => PipelineError::Model(other),
        }
    }
}
