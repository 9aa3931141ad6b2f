//! Error types for feature acquisition.

use thiserror::Error;

/// Errors that can occur while fetching or converting one feature category.
///
/// Every variant degrades to a placeholder layer; none aborts the run.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// Request could not be sent or the response could not be read.
    #[error("Network failure: {0}")]
    Network(String),

    /// Service answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// Status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// Service answered 200 but reported a runtime error in the payload.
    #[error("Feature service error: {0}")]
    Service(String),

    /// Payload is not well-formed OSM XML.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Payload could not be turned into features.
    #[error("Conversion failure: {0}")]
    Conversion(String),

    /// I/O error writing the raw payload or the GeoJSON output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// GeoJSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AcquisitionError {
    /// Whether the failure happened talking to the service rather than
    /// converting its answer.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            AcquisitionError::Network(_)
                | AcquisitionError::HttpStatus { .. }
                | AcquisitionError::Service(_)
        )
    }
}
