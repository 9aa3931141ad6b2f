//! Typed engine requests.
//!
//! Every request is validated before it reaches the engine, so that a bad
//! parameter is reported as [`EngineError::InvalidRequest`] rather than as
//! an opaque tool failure.

use crate::{EngineError, ProcessingEngine, RasterInfo, Result};
use carto_model::style::{Color, RampInterpolation};
use carto_model::{BoundingBox, Crs};
use std::path::{Path, PathBuf};

/// A unit of work for a [`ProcessingEngine`].
pub trait EngineRequest {
    /// What the engine returns on success.
    type Output;

    /// Short name used in error messages.
    const NAME: &'static str;

    /// Check parameters without touching the engine.
    fn validate(&self) -> Result<()>;

    /// Hand the request to the matching engine operation.
    fn dispatch(&self, engine: &dyn ProcessingEngine) -> Result<Self::Output>;
}

/// Validate `request` and run it on `engine`.
pub fn submit<Q: EngineRequest>(engine: &dyn ProcessingEngine, request: &Q) -> Result<Q::Output> {
    request.validate()?;
    request.dispatch(engine)
}

fn require_path(request: &'static str, what: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(EngineError::invalid(request, format!("{} path is empty", what)));
    }
    Ok(())
}

fn require_distinct(request: &'static str, source: &Path, output: &Path) -> Result<()> {
    require_path(request, "source", source)?;
    require_path(request, "output", output)?;
    if source == output {
        return Err(EngineError::invalid(
            request,
            format!("output {} would overwrite the source", output.display()),
        ));
    }
    Ok(())
}

/// Resampling used when warping rasters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resampling {
    /// Nearest neighbour.
    #[default]
    Nearest,
    /// Bilinear.
    Bilinear,
    /// Cubic convolution.
    Cubic,
}

impl Resampling {
    /// gdalwarp `-r` value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Resampling::Nearest => "near",
            Resampling::Bilinear => "bilinear",
            Resampling::Cubic => "cubic",
        }
    }
}

/// Open a raster and report its size, bounds and reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRequest {
    /// Raster to inspect.
    pub source: PathBuf,
}

impl EngineRequest for ProbeRequest {
    type Output = RasterInfo;
    const NAME: &'static str = "probe";

    fn validate(&self) -> Result<()> {
        require_path(Self::NAME, "source", &self.source)
    }

    fn dispatch(&self, engine: &dyn ProcessingEngine) -> Result<RasterInfo> {
        engine.probe_raster(self)
    }
}

/// Cut a raster to a rectangle or to a polygon mask.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipRequest {
    /// Input raster.
    pub source: PathBuf,
    /// Output GeoTIFF.
    pub output: PathBuf,
    /// Target window.
    pub bounds: BoundingBox,
    /// Reference of `bounds`.
    pub bounds_crs: Crs,
    /// Polygon file to mask with and crop to, instead of the window.
    pub cutline: Option<PathBuf>,
}

impl EngineRequest for ClipRequest {
    type Output = PathBuf;
    const NAME: &'static str = "clip";

    fn validate(&self) -> Result<()> {
        require_distinct(Self::NAME, &self.source, &self.output)?;
        if !self.bounds.is_valid() {
            return Err(EngineError::invalid(Self::NAME, "clip window is empty or not finite"));
        }
        if let Some(cutline) = &self.cutline {
            require_path(Self::NAME, "cutline", cutline)?;
        }
        Ok(())
    }

    fn dispatch(&self, engine: &dyn ProcessingEngine) -> Result<PathBuf> {
        engine.clip_raster(self)
    }
}

/// Reproject a raster.
#[derive(Debug, Clone, PartialEq)]
pub struct WarpRequest {
    /// Input raster.
    pub source: PathBuf,
    /// Output GeoTIFF.
    pub output: PathBuf,
    /// Destination reference.
    pub target_crs: Crs,
    /// Resampling method.
    pub resampling: Resampling,
}

impl EngineRequest for WarpRequest {
    type Output = PathBuf;
    const NAME: &'static str = "warp";

    fn validate(&self) -> Result<()> {
        require_distinct(Self::NAME, &self.source, &self.output)
    }

    fn dispatch(&self, engine: &dyn ProcessingEngine) -> Result<PathBuf> {
        engine.warp_raster(self)
    }
}

/// Derive shaded relief from an elevation raster.
#[derive(Debug, Clone, PartialEq)]
pub struct HillshadeRequest {
    /// Elevation raster.
    pub source: PathBuf,
    /// Output GeoTIFF.
    pub output: PathBuf,
    /// Vertical exaggeration.
    pub z_factor: f64,
    /// Light direction, degrees clockwise from north.
    pub azimuth: f64,
    /// Light elevation, degrees above the horizon.
    pub altitude: f64,
}

impl EngineRequest for HillshadeRequest {
    type Output = PathBuf;
    const NAME: &'static str = "hillshade";

    fn validate(&self) -> Result<()> {
        require_distinct(Self::NAME, &self.source, &self.output)?;
        if !(self.z_factor.is_finite() && self.z_factor > 0.0) {
            return Err(EngineError::invalid(Self::NAME, "z-factor must be positive"));
        }
        if !(0.0..=360.0).contains(&self.azimuth) {
            return Err(EngineError::invalid(Self::NAME, "azimuth must be within 0-360"));
        }
        if !(0.0..=90.0).contains(&self.altitude) {
            return Err(EngineError::invalid(Self::NAME, "altitude must be within 0-90"));
        }
        Ok(())
    }

    fn dispatch(&self, engine: &dyn ProcessingEngine) -> Result<PathBuf> {
        engine.hillshade(self)
    }
}

/// One entry of a color-relief table, at an absolute raster value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReliefStop {
    /// Raster value.
    pub value: f64,
    /// Color.
    pub color: Color,
}

/// Render a raster through a color table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorReliefRequest {
    /// Elevation raster.
    pub source: PathBuf,
    /// Output RGBA GeoTIFF.
    pub output: PathBuf,
    /// Color table, ascending by value.
    pub stops: Vec<ReliefStop>,
    /// Blend between entries or snap to the nearest.
    pub interpolation: RampInterpolation,
}

impl ColorReliefRequest {
    /// Contents of the color table file: one `value r g b` line per stop,
    /// then a transparent nodata entry.
    pub fn color_table(&self) -> String {
        let mut table = String::new();
        for stop in &self.stops {
            table.push_str(&format!(
                "{} {} {} {}\n",
                stop.value, stop.color.r, stop.color.g, stop.color.b
            ));
        }
        table.push_str("nv 0 0 0 0\n");
        table
    }
}

impl EngineRequest for ColorReliefRequest {
    type Output = PathBuf;
    const NAME: &'static str = "color-relief";

    fn validate(&self) -> Result<()> {
        require_distinct(Self::NAME, &self.source, &self.output)?;
        if self.stops.len() < 2 {
            return Err(EngineError::invalid(Self::NAME, "needs at least two color stops"));
        }
        if self.stops.iter().any(|s| !s.value.is_finite()) {
            return Err(EngineError::invalid(Self::NAME, "stop values must be finite"));
        }
        // Equal neighbours are allowed: a flat DEM collapses every stop onto one value.
        if self.stops.windows(2).any(|w| w[0].value > w[1].value) {
            return Err(EngineError::invalid(Self::NAME, "stop values must be ascending"));
        }
        Ok(())
    }

    fn dispatch(&self, engine: &dyn ProcessingEngine) -> Result<PathBuf> {
        engine.color_relief(self)
    }
}

/// Trace contour lines from an elevation raster.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourRequest {
    /// Elevation raster.
    pub source: PathBuf,
    /// Output GeoJSON.
    pub output: PathBuf,
    /// Elevation step between lines.
    pub interval: f64,
    /// Attribute receiving each line's elevation.
    pub attribute: String,
}

impl EngineRequest for ContourRequest {
    type Output = PathBuf;
    const NAME: &'static str = "contour";

    fn validate(&self) -> Result<()> {
        require_distinct(Self::NAME, &self.source, &self.output)?;
        if !(self.interval.is_finite() && self.interval > 0.0) {
            return Err(EngineError::invalid(Self::NAME, "interval must be positive"));
        }
        if self.attribute.trim().is_empty() {
            return Err(EngineError::invalid(Self::NAME, "elevation attribute name is empty"));
        }
        Ok(())
    }

    fn dispatch(&self, engine: &dyn ProcessingEngine) -> Result<PathBuf> {
        engine.contours(self)
    }
}

/// Reproject a vector file.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorReprojectRequest {
    /// Input vector file.
    pub source: PathBuf,
    /// Output GeoJSON.
    pub output: PathBuf,
    /// Reference of the input, when the file itself does not declare one.
    pub source_crs: Option<Crs>,
    /// Destination reference.
    pub target_crs: Crs,
}

impl EngineRequest for VectorReprojectRequest {
    type Output = PathBuf;
    const NAME: &'static str = "vector-reproject";

    fn validate(&self) -> Result<()> {
        require_distinct(Self::NAME, &self.source, &self.output)
    }

    fn dispatch(&self, engine: &dyn ProcessingEngine) -> Result<PathBuf> {
        engine.reproject_vector(self)
    }
}

/// Transform a bounding box between references.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformBoundsRequest {
    /// Box in `from` units.
    pub bounds: BoundingBox,
    /// Source reference.
    pub from: Crs,
    /// Destination reference.
    pub to: Crs,
}

impl EngineRequest for TransformBoundsRequest {
    type Output = BoundingBox;
    const NAME: &'static str = "transform-bounds";

    fn validate(&self) -> Result<()> {
        if !self.bounds.is_valid() {
            return Err(EngineError::invalid(Self::NAME, "bounds are empty or not finite"));
        }
        Ok(())
    }

    fn dispatch(&self, engine: &dyn ProcessingEngine) -> Result<BoundingBox> {
        if self.from == self.to {
            return Ok(self.bounds);
        }
        engine.transform_bounds(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utm() -> Crs {
        Crs::new("EPSG:32650").unwrap()
    }

    fn relief(values: &[f64]) -> ColorReliefRequest {
        ColorReliefRequest {
            source: "dem.tif".into(),
            output: "dem_render.tif".into(),
            stops: values
                .iter()
                .map(|&value| ReliefStop {
                    value,
                    color: Color::BLACK,
                })
                .collect(),
            interpolation: RampInterpolation::Interpolated,
        }
    }

    #[test]
    fn test_output_must_not_overwrite_source() {
        let req = WarpRequest {
            source: "dem.tif".into(),
            output: "dem.tif".into(),
            target_crs: utm(),
            resampling: Resampling::Bilinear,
        };
        assert!(matches!(
            req.validate(),
            Err(EngineError::InvalidRequest { request: "warp", .. })
        ));
    }

    #[test]
    fn test_hillshade_ranges() {
        let mut req = HillshadeRequest {
            source: "dem.tif".into(),
            output: "shade.tif".into(),
            z_factor: 1.0,
            azimuth: 315.0,
            altitude: 35.0,
        };
        req.validate().unwrap();
        req.altitude = 91.0;
        assert!(req.validate().is_err());
        req.altitude = 35.0;
        req.z_factor = 0.0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_color_relief_stops() {
        relief(&[0.0, 290.0, 890.0, 1000.0]).validate().unwrap();
        relief(&[500.0, 500.0]).validate().unwrap();
        assert!(relief(&[10.0]).validate().is_err());
        assert!(relief(&[10.0, 5.0]).validate().is_err());
        assert!(relief(&[0.0, f64::NAN]).validate().is_err());
    }

    #[test]
    fn test_color_table_format() {
        let mut req = relief(&[0.0, 1000.0]);
        req.stops[0].color = Color::rgb(0xd8, 0xe5, 0xbe);
        req.stops[1].color = Color::rgb(0x00, 0x66, 0x03);
        assert_eq!(req.color_table(), "0 216 229 190\n1000 0 102 3\nnv 0 0 0 0\n");
    }

    #[test]
    fn test_contour_interval() {
        let mut req = ContourRequest {
            source: "dem.tif".into(),
            output: "contour_100m.geojson".into(),
            interval: 100.0,
            attribute: "ELEV".to_string(),
        };
        req.validate().unwrap();
        req.interval = -20.0;
        assert!(req.validate().is_err());
        req.interval = 20.0;
        req.attribute = " ".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_clip_requires_window() {
        let req = ClipRequest {
            source: "src.tif".into(),
            output: "clipped_dem.tif".into(),
            bounds: BoundingBox {
                min_x: 1.0,
                min_y: 0.0,
                max_x: 0.0,
                max_y: 1.0,
            },
            bounds_crs: utm(),
            cutline: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_empty_probe_path() {
        let req = ProbeRequest {
            source: PathBuf::new(),
        };
        assert!(req.validate().is_err());
    }
}
