//! Error types for the DEM crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when reading or writing elevation rasters.
#[derive(Debug, Error)]
pub enum DemError {
    /// I/O error reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF encoding or decoding error.
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Invalid GeoTIFF - malformed georeferencing tags.
    #[error("Invalid GeoTIFF: {0}")]
    InvalidGeoTiff(String),

    /// Every cell of the raster is nodata.
    #[error("Raster {0} has no valid cells")]
    NoValidData(PathBuf),

    /// Pixel buffer does not match the declared dimensions.
    #[error("Expected {expected} cells for the raster, got {actual}")]
    DimensionMismatch {
        /// width * height.
        expected: usize,
        /// Length of the supplied buffer.
        actual: usize,
    },

    /// Cell index outside the raster.
    #[error("Cell ({col}, {row}) is outside a {width}x{height} raster")]
    OutOfBounds {
        /// Requested column.
        col: u32,
        /// Requested row.
        row: u32,
        /// Raster width.
        width: u32,
        /// Raster height.
        height: u32,
    },
}
