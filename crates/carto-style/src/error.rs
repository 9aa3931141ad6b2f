//! Style application errors.

use carto_model::GeometryKind;
use thiserror::Error;

/// A style rule could not be applied to a layer.
///
/// The styling pass logs these and leaves the layer unstyled.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StyleError {
    /// Symbol drawn on the wrong geometry, e.g. a marker on a line layer.
    #[error("Layer '{layer}': {symbol} symbol cannot be drawn on {found} geometry")]
    GeometryMismatch {
        /// Layer name.
        layer: String,
        /// Geometry the symbol draws.
        symbol: GeometryKind,
        /// Geometry the layer holds.
        found: GeometryKind,
    },

    /// Raster renderer on a vector layer or vector renderer on a raster.
    #[error("Layer '{layer}': {renderer} renderer does not fit a {kind} layer")]
    RendererMismatch {
        /// Layer name.
        layer: String,
        /// Renderer name.
        renderer: &'static str,
        /// `raster` or `vector`.
        kind: &'static str,
    },

    /// Categorized or label field absent from the layer schema.
    #[error("Layer '{layer}' has no field '{field}'")]
    MissingField {
        /// Layer name.
        layer: String,
        /// Field name.
        field: String,
    },

    /// Color ramp needs observed statistics that were not supplied.
    #[error("Layer '{0}': observed elevation range unknown")]
    MissingStatistics(String),

    /// Ramp configuration unusable.
    #[error("Invalid color ramp: {0}")]
    InvalidRamp(String),
}
