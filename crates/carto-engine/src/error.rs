//! Error types for engine operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when submitting work to the processing engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// I/O error preparing inputs or reading outputs.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tool produced JSON that could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Model value could not be built from tool output.
    #[error("Model error: {0}")]
    Model(#[from] carto_model::ModelError),

    /// Request parameters failed validation; nothing was run.
    #[error("Invalid {request} request: {reason}")]
    InvalidRequest {
        /// Request type name.
        request: &'static str,
        /// What was wrong.
        reason: String,
    },

    /// Source raster could not be opened or has no usable georeferencing.
    #[error("Source {path} is unreadable: {reason}")]
    SourceUnreadable {
        /// Source path.
        path: PathBuf,
        /// Underlying failure.
        reason: String,
    },

    /// Engine executable is not installed or not on the search path.
    #[error("Engine tool '{0}' not found")]
    ToolNotFound(String),

    /// Engine executable exited unsuccessfully.
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        /// Executable name.
        tool: String,
        /// Exit status description.
        status: String,
        /// Captured standard error.
        stderr: String,
    },

    /// Engine reported success but its output could not be understood.
    #[error("Unexpected output from {tool}: {detail}")]
    UnexpectedOutput {
        /// Executable name.
        tool: String,
        /// What was wrong.
        detail: String,
    },
}

impl EngineError {
    pub(crate) fn invalid(request: &'static str, reason: impl Into<String>) -> Self {
        EngineError::InvalidRequest {
            request,
            reason: reason.into(),
        }
    }
}
