//! Command-line arguments.

use carto_model::{BoundingBox, CartoConfig, ClipMode, Crs, ModelError};
use carto_runner::{ExtentSource, PipelineError};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "carto")]
#[command(about = "Produce a styled topographic map project from a DEM and OpenStreetMap features")]
#[command(version)]
pub struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output directory (overrides the configuration)
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Target spatial reference, e.g. EPSG:32650
    #[arg(long, global = true)]
    pub target_crs: Option<String>,

    /// Source DEM GeoTIFF
    #[arg(long, global = true)]
    pub dem: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every stage: extent, elevation, features, reprojection, styling
    Run {
        #[command(flatten)]
        extent: ExtentArgs,

        #[command(flatten)]
        dem: DemArgs,

        #[command(flatten)]
        features: FeatureArgs,
    },
    /// Define the map extent
    Extent {
        #[command(flatten)]
        extent: ExtentArgs,
    },
    /// Clip, reproject, hillshade, color-ramp and contour the DEM
    Dem {
        #[command(flatten)]
        dem: DemArgs,
    },
    /// Fetch the six feature categories from the Overpass API
    Features {
        #[command(flatten)]
        features: FeatureArgs,
    },
    /// Reproject every layer into the target reference
    Reproject,
    /// Apply the map style to every layer
    Style,
    /// List the feature categories
    Categories,
}

#[derive(Args, Debug, Default)]
pub struct ExtentArgs {
    /// Rectangle as minx,miny,maxx,maxy
    #[arg(long, conflicts_with_all = ["extent_file", "from_dem"])]
    pub bbox: Option<String>,

    /// GeoJSON file with the drawn extent polygon
    #[arg(long, conflicts_with = "from_dem")]
    pub extent_file: Option<PathBuf>,

    /// Use the full bounds of the source DEM
    #[arg(long)]
    pub from_dem: bool,

    /// Reference of the extent coordinates (defaults to the target reference)
    #[arg(long)]
    pub extent_crs: Option<String>,
}

impl ExtentArgs {
    /// The requested source, or `None` if no extent option was given.
    pub fn source(&self, config: &CartoConfig) -> Result<Option<ExtentSource>, PipelineError> {
        let crs = match &self.extent_crs {
            Some(id) => Crs::new(id)?,
            None => config.target_crs.clone(),
        };
        if let Some(bbox) = &self.bbox {
            return Ok(Some(ExtentSource::Rect {
                bbox: BoundingBox::parse(bbox)?,
                crs,
            }));
        }
        if let Some(path) = &self.extent_file {
            return Ok(Some(ExtentSource::GeoJson {
                path: path.clone(),
                crs,
            }));
        }
        if self.from_dem {
            return Ok(Some(ExtentSource::SourceDem));
        }
        Ok(None)
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ClipModeArg {
    /// Cut to the extent's bounding box
    Extent,
    /// Cut to the extent polygon
    Mask,
}

impl From<ClipModeArg> for ClipMode {
    fn from(arg: ClipModeArg) -> Self {
        match arg {
            ClipModeArg::Extent => ClipMode::Extent,
            ClipModeArg::Mask => ClipMode::Mask,
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct DemArgs {
    /// How the DEM is cut to the extent
    #[arg(long, value_enum)]
    pub clip_mode: Option<ClipModeArg>,

    /// Hillshade light azimuth in degrees
    #[arg(long)]
    pub azimuth: Option<f64>,

    /// Hillshade light altitude in degrees
    #[arg(long)]
    pub altitude: Option<f64>,

    /// Hillshade vertical exaggeration
    #[arg(long)]
    pub z_factor: Option<f64>,

    /// DEM color-ramp layer opacity in percent
    #[arg(long)]
    pub render_opacity: Option<u8>,
}

#[derive(Args, Debug, Default)]
pub struct FeatureArgs {
    /// Overpass interpreter URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl Cli {
    /// Load the configuration file (or defaults) and apply flag overrides.
    pub fn load_config(&self) -> Result<CartoConfig, ModelError> {
        let mut config = match &self.config {
            Some(path) => CartoConfig::from_yaml_file(path)?,
            None => CartoConfig::default(),
        };

        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(crs) = &self.target_crs {
            config.target_crs = Crs::new(crs)?;
        }
        if let Some(dem) = &self.dem {
            config.source_dem = Some(dem.clone());
        }

        match &self.command {
            Command::Run { dem, features, .. } => {
                dem.apply(&mut config);
                features.apply(&mut config);
            }
            Command::Dem { dem } => dem.apply(&mut config),
            Command::Features { features } => features.apply(&mut config),
            _ => {}
        }

        config.validate()?;
        Ok(config)
    }
}

impl DemArgs {
    fn apply(&self, config: &mut CartoConfig) {
        if let Some(mode) = self.clip_mode {
            config.clip_mode = mode.into();
        }
        if let Some(azimuth) = self.azimuth {
            config.hillshade.azimuth = azimuth;
        }
        if let Some(altitude) = self.altitude {
            config.hillshade.altitude = altitude;
        }
        if let Some(z_factor) = self.z_factor {
            config.hillshade.z_factor = z_factor;
        }
        if let Some(opacity) = self.render_opacity {
            config.dem_render.opacity_percent = opacity;
        }
    }
}

impl FeatureArgs {
    fn apply(&self, config: &mut CartoConfig) {
        if let Some(endpoint) = &self.endpoint {
            config.overpass.endpoint = endpoint.clone();
        }
        if let Some(timeout) = self.timeout {
            config.overpass.timeout_secs = timeout;
        }
    }
}
