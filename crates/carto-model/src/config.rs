//! Run configuration.
//!
//! Every constant the workflow uses has a default here. A YAML file may
//! override any subset of fields; command-line flags override the file.

use crate::style::{Color, RampInterpolation};
use crate::{Crs, ModelError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default target spatial reference (UTM zone 50N).
pub const DEFAULT_TARGET_CRS: &str = "EPSG:32650";

/// Default Overpass API interpreter endpoint.
pub const DEFAULT_OVERPASS_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

/// Default feature-service request timeout.
pub const DEFAULT_OVERPASS_TIMEOUT_SECS: u64 = 180;

/// How the source DEM is cut to the extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipMode {
    /// Cut to the extent's bounding box.
    #[default]
    Extent,
    /// Cut to the extent polygon itself (crop to cutline).
    Mask,
}

/// Shaded relief parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HillshadeConfig {
    /// Vertical exaggeration.
    pub z_factor: f64,
    /// Light direction in degrees clockwise from north.
    pub azimuth: f64,
    /// Light elevation in degrees above the horizon.
    pub altitude: f64,
}

impl Default for HillshadeConfig {
    fn default() -> Self {
        Self {
            z_factor: 1.0,
            azimuth: 315.0,
            altitude: 35.0,
        }
    }
}

/// A color-ramp stop at a fraction of the observed elevation range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RampStop {
    /// Position within [min, max], from 0.0 to 1.0.
    pub position: f64,
    /// Color at this position.
    pub color: Color,
}

impl RampStop {
    /// Create a stop.
    pub const fn new(position: f64, color: Color) -> Self {
        Self { position, color }
    }
}

/// Color-ramp rendering of the DEM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemRenderConfig {
    /// Layer opacity in percent.
    pub opacity_percent: u8,
    /// Ramp stops in ascending position order.
    pub stops: Vec<RampStop>,
    /// Interpolation between stops.
    pub interpolation: RampInterpolation,
}

impl Default for DemRenderConfig {
    fn default() -> Self {
        Self {
            opacity_percent: 80,
            stops: vec![
                RampStop::new(0.0, Color::rgb(0xd8, 0xe5, 0xbe)),
                RampStop::new(0.29, Color::rgb(0xad, 0xd5, 0x9c)),
                RampStop::new(0.89, Color::rgb(0x4c, 0xaf, 0x50)),
                RampStop::new(1.0, Color::rgb(0x00, 0x66, 0x03)),
            ],
            interpolation: RampInterpolation::Interpolated,
        }
    }
}

/// One contour product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourConfig {
    /// Elevation interval between lines.
    pub interval: u32,
    /// Line color.
    pub color: Color,
    /// Line width in mm.
    pub width_mm: f64,
    /// Layer opacity in percent.
    pub opacity_percent: u8,
    /// Whether lines carry elevation labels.
    pub labeled: bool,
}

impl ContourConfig {
    /// 100-unit index contours, labeled.
    pub fn index_lines() -> Self {
        Self {
            interval: 100,
            color: Color::rgb(0xff, 0xfa, 0xc1),
            width_mm: 0.3,
            opacity_percent: 60,
            labeled: true,
        }
    }

    /// 20-unit intermediate contours, unlabeled.
    pub fn intermediate_lines() -> Self {
        Self {
            interval: 20,
            color: Color::rgb(0xff, 0xf5, 0xa5),
            width_mm: 0.1,
            opacity_percent: 50,
            labeled: false,
        }
    }

    /// Layer name and output file stem, e.g. `contour_100m`.
    pub fn layer_name(&self) -> String {
        format!("contour_{}m", self.interval)
    }
}

/// Feature service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverpassConfig {
    /// Interpreter endpoint URL.
    pub endpoint: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// User agent sent with requests.
    pub user_agent: String,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OVERPASS_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_OVERPASS_TIMEOUT_SECS,
            user_agent: format!("cartoflow/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Processing engine settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the GDAL utilities. `None` searches `PATH`.
    pub bin_dir: Option<PathBuf>,
}

/// Complete run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartoConfig {
    /// Every layer ends up in this reference.
    pub target_crs: Crs,
    /// Where artifacts and `project.yaml` are written.
    pub output_dir: PathBuf,
    /// Source elevation raster.
    pub source_dem: Option<PathBuf>,
    /// How the DEM is cut to the extent.
    pub clip_mode: ClipMode,
    /// Shaded relief parameters.
    pub hillshade: HillshadeConfig,
    /// DEM color-ramp rendering.
    pub dem_render: DemRenderConfig,
    /// Contour products, each produced independently.
    pub contours: Vec<ContourConfig>,
    /// Feature service.
    pub overpass: OverpassConfig,
    /// Processing engine.
    pub engine: EngineConfig,
}

impl Default for CartoConfig {
    fn default() -> Self {
        Self {
            target_crs: Crs::from_normalized(DEFAULT_TARGET_CRS),
            output_dir: PathBuf::from("./output"),
            source_dem: None,
            clip_mode: ClipMode::Extent,
            hillshade: HillshadeConfig::default(),
            dem_render: DemRenderConfig::default(),
            contours: vec![ContourConfig::index_lines(), ContourConfig::intermediate_lines()],
            overpass: OverpassConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl CartoConfig {
    /// Parse and validate YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Contour settings for an interval, if configured.
    pub fn contour(&self, interval: u32) -> Option<&ContourConfig> {
        self.contours.iter().find(|c| c.interval == interval)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        let hs = &self.hillshade;
        if !(0.0..=360.0).contains(&hs.azimuth) {
            return Err(ModelError::Config(format!(
                "hillshade azimuth {} outside 0-360",
                hs.azimuth
            )));
        }
        if !(0.0..=90.0).contains(&hs.altitude) {
            return Err(ModelError::Config(format!(
                "hillshade altitude {} outside 0-90",
                hs.altitude
            )));
        }
        if !(hs.z_factor.is_finite() && hs.z_factor > 0.0) {
            return Err(ModelError::Config(format!(
                "hillshade z-factor {} must be positive",
                hs.z_factor
            )));
        }

        check_opacity("dem_render", self.dem_render.opacity_percent)?;
        let stops = &self.dem_render.stops;
        if stops.len() < 2 {
            return Err(ModelError::Config(
                "color ramp needs at least two stops".to_string(),
            ));
        }
        if stops.iter().any(|s| !(0.0..=1.0).contains(&s.position)) {
            return Err(ModelError::Config(
                "color ramp stop positions must be within 0.0-1.0".to_string(),
            ));
        }
        if stops.windows(2).any(|w| w[0].position >= w[1].position) {
            return Err(ModelError::Config(
                "color ramp stops must be strictly ascending".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for contour in &self.contours {
            if contour.interval == 0 {
                return Err(ModelError::Config("contour interval must be > 0".to_string()));
            }
            if !seen.insert(contour.interval) {
                return Err(ModelError::Config(format!(
                    "contour interval {} configured twice",
                    contour.interval
                )));
            }
            if !(contour.width_mm.is_finite() && contour.width_mm > 0.0) {
                return Err(ModelError::Config(format!(
                    "contour {} width must be positive",
                    contour.interval
                )));
            }
            check_opacity(&contour.layer_name(), contour.opacity_percent)?;
        }

        if self.overpass.timeout_secs == 0 {
            return Err(ModelError::Config("overpass timeout must be > 0".to_string()));
        }
        if self.overpass.endpoint.trim().is_empty() {
            return Err(ModelError::Config("overpass endpoint is empty".to_string()));
        }

        Ok(())
    }
}

fn check_opacity(what: &str, opacity: u8) -> Result<()> {
    if opacity > 100 {
        return Err(ModelError::Config(format!(
            "{} opacity {}% exceeds 100",
            what, opacity
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CartoConfig::default();
        assert_eq!(config.target_crs.as_str(), "EPSG:32650");
        assert_eq!(config.hillshade.azimuth, 315.0);
        assert_eq!(config.hillshade.altitude, 35.0);
        assert_eq!(config.hillshade.z_factor, 1.0);
        assert_eq!(config.dem_render.opacity_percent, 80);
        assert_eq!(config.overpass.timeout_secs, 180);
        assert_eq!(config.clip_mode, ClipMode::Extent);

        let positions: Vec<f64> = config.dem_render.stops.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![0.0, 0.29, 0.89, 1.0]);

        let index = config.contour(100).unwrap();
        assert!(index.labeled);
        assert_eq!(index.opacity_percent, 60);
        assert_eq!(index.layer_name(), "contour_100m");
        let minor = config.contour(20).unwrap();
        assert!(!minor.labeled);
        assert_eq!(minor.width_mm, 0.1);

        config.validate().unwrap();
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
target_crs: "epsg:32649"
clip_mode: mask
hillshade:
  azimuth: 300
dem_render:
  opacity_percent: 70
"#;
        let config = CartoConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.target_crs.as_str(), "EPSG:32649");
        assert_eq!(config.clip_mode, ClipMode::Mask);
        assert_eq!(config.hillshade.azimuth, 300.0);
        assert_eq!(config.hillshade.altitude, 35.0);
        assert_eq!(config.dem_render.opacity_percent, 70);
        assert_eq!(config.dem_render.stops.len(), 4);
        assert_eq!(config.contours.len(), 2);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = CartoConfig::default();
        let yaml = config.to_yaml_string().unwrap();
        let back = CartoConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = CartoConfig::default();
        config.hillshade.altitude = 95.0;
        assert!(config.validate().is_err());

        let mut config = CartoConfig::default();
        config.dem_render.stops.swap(1, 2);
        assert!(config.validate().is_err());

        let mut config = CartoConfig::default();
        config.contours.push(ContourConfig::index_lines());
        assert!(config.validate().is_err());

        let mut config = CartoConfig::default();
        config.dem_render.opacity_percent = 101;
        assert!(config.validate().is_err());

        let mut config = CartoConfig::default();
        config.overpass.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("carto.yaml");
        std::fs::write(&path, "output_dir: /tmp/lushan\ncontours: []\n").unwrap();
        let config = CartoConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/lushan"));
        assert!(config.contours.is_empty());
    }
}
