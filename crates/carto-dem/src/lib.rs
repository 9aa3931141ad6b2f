//! # carto-dem
//!
//! GeoTIFF elevation raster access for Cartoflow.
//!
//! The elevation pipeline delegates clipping, warping and terrain analysis
//! to the processing engine, but the color ramp is anchored on the values
//! actually present in the reprojected DEM. This crate reads those values:
//!
//! - [`DemRaster`] - a single-band raster with bounds, CRS and nodata handling
//! - [`BandStatistics`] - observed min/max/mean over valid cells
//! - [`write_geotiff`] - writes a georeferenced float GeoTIFF
//!
//! ## Example
//!
//! ```no_run
//! use carto_dem::DemRaster;
//!
//! let dem = DemRaster::from_file("output/dem.tif")?;
//! let stats = dem.statistics()?;
//! println!("Elevation range: {} - {}", stats.min, stats.max);
//! # Ok::<(), carto_dem::DemError>(())
//! ```

mod error;
mod geokeys;
mod raster;
mod writer;

pub use error::DemError;
pub use raster::{BandStatistics, DemRaster};
pub use writer::{write_geotiff, GeoTiffSpec};

/// Result type for DEM operations.
pub type Result<T> = std::result::Result<T, DemError>;
