//! Error types for the model crate.

use thiserror::Error;

/// Errors that can occur while building or persisting model objects.
#[derive(Debug, Error)]
pub enum ModelError {
    /// I/O error reading or writing a project file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML (de)serialization error for configuration or project files.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON (de)serialization error for GeoJSON extent files.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Spatial reference string could not be understood.
    #[error("Invalid spatial reference: {0}")]
    InvalidCrs(String),

    /// Bounding box is not finite or has zero/negative size.
    #[error("Invalid bounding box ({min_x}, {min_y}, {max_x}, {max_y})")]
    InvalidBounds {
        /// Minimum X.
        min_x: f64,
        /// Minimum Y.
        min_y: f64,
        /// Maximum X.
        max_x: f64,
        /// Maximum Y.
        max_y: f64,
    },

    /// No polygon was drawn or supplied for the extent.
    #[error("No extent polygon was drawn")]
    EmptyExtent,

    /// Extent polygon is degenerate.
    #[error("Invalid extent polygon: {0}")]
    InvalidExtent(String),

    /// A layer with this name is already registered.
    #[error("Layer '{0}' is already registered")]
    DuplicateLayer(String),

    /// No layer with this name is registered.
    #[error("Layer '{0}' not found")]
    LayerNotFound(String),

    /// Unknown feature category key.
    #[error("Unknown feature category '{0}'")]
    UnknownCategory(String),

    /// Configuration value out of range.
    #[error("Configuration error: {0}")]
    Config(String),
}
